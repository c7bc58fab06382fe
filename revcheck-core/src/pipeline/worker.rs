use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::pipeline::{CheckJob, CheckOutcome, CheckTask, PipelineEvent};
use tracing::{debug, error, instrument, warn};

use super::CheckContext;
use crate::check::CheckRequest;
use crate::fetch::SourceFetch;
use crate::report;

pub(crate) fn get_panic_message(e: Box<dyn std::any::Any + Send>) -> String {
    match e.downcast_ref::<&'static str>() {
        Some(s) => (*s).to_string(),
        None => match e.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "Unknown panic payload".to_string(),
        },
    }
}

fn prepare_workdir(workdir: &Path) -> Result<()> {
    if workdir.exists() {
        fs::remove_dir_all(workdir).map_err(|e| {
            RevcheckError::IoError(format!("Failed to clear {}: {e}", workdir.display()))
        })?;
    }
    fs::create_dir_all(workdir).map_err(|e| {
        RevcheckError::IoError(format!("Failed to create {}: {e}", workdir.display()))
    })
}

/// Fetches the source and runs the check. Returns the outcome together with
/// the log to store next to it.
fn run_steps(job: &CheckJob, workdir: &Path, ctx: &CheckContext) -> Result<(CheckOutcome, String)> {
    let fetched = ctx
        .source_cache
        .fetch_source(&job.name, &ctx.source_snapshot)?;
    let archive = match &fetched {
        SourceFetch::NoSource => {
            warn!("[{}] No source archive available; skipping", job.name);
            return Ok((CheckOutcome::no_source(), String::new()));
        }
        SourceFetch::Downloaded(path) => {
            let _ = ctx.event_tx.send(PipelineEvent::DownloadFinished {
                name: job.name.clone(),
                path: path.clone(),
            });
            path
        }
        SourceFetch::Cached(path) => path,
    };

    let request = CheckRequest {
        name: &job.name,
        archive,
        options: ctx.options,
        workdir,
        search_path: &ctx.search_path,
    };
    let result = ctx.runner.run_check(&request)?;
    let outcome = if result.success {
        CheckOutcome::Passed
    } else {
        let reason = match result.exit_code {
            Some(code) => format!("check reported problems (exit code {code})"),
            None => "check terminated by signal".to_string(),
        };
        CheckOutcome::Failed(reason)
    };
    Ok((outcome, result.log))
}

/// Runs one check job to a final task record. Never fails and never
/// unwinds: errors and panics become a `Failed` outcome for this job only.
#[instrument(skip(ctx), fields(index = job.index, name = %job.name))]
pub fn execute_check_job(job: CheckJob, ctx: &CheckContext) -> CheckTask {
    let workdir = report::workdir_path(&ctx.results_dir, &job.name);
    let _ = ctx.event_tx.send(PipelineEvent::CheckStarted {
        index: job.index,
        name: job.name.clone(),
    });
    let prepared = prepare_workdir(&workdir);

    let started_at = Utc::now();
    let clock = Instant::now();
    let result = match prepared {
        Ok(()) => panic::catch_unwind(AssertUnwindSafe(|| run_steps(&job, &workdir, ctx))),
        Err(e) => Ok(Err(e)),
    };
    let elapsed_secs = clock.elapsed().as_secs_f64();
    let finished_at = Utc::now();

    let (outcome, log) = match result {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            error!("[{}] Check failed: {}", job.name, e);
            (CheckOutcome::failed(&e), e.to_string())
        }
        Err(payload) => {
            let message = get_panic_message(payload);
            error!("[{}] Check panicked: {}", job.name, message);
            (CheckOutcome::Failed(format!("check panicked: {message}")), message)
        }
    };

    if let Err(e) = report::write_status(&workdir, &outcome, &log) {
        error!("[{}] Could not write check status: {}", job.name, e);
    }
    if let Err(e) = report::write_result(&ctx.results_dir, job.index, &job.name, elapsed_secs) {
        error!("[{}] Could not write timing record: {}", job.name, e);
    }
    debug!("[{}] {} in {:.1}s", job.name, outcome, elapsed_secs);

    let _ = ctx.event_tx.send(PipelineEvent::CheckFinished {
        index: job.index,
        name: job.name.clone(),
        outcome: outcome.clone(),
        elapsed_secs,
    });
    CheckTask {
        index: job.index,
        name: job.name,
        started_at,
        finished_at,
        elapsed_secs,
        outcome,
    }
}
