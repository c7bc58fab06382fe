// revcheck/src/pipeline/runner.rs
use std::path::PathBuf;
use std::sync::Arc;

use revcheck_common::config::Config;
use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::pipeline::{Phase, PipelineEvent};
use revcheck_core::{
    install, run_all, CheckContext, CheckOptions, CommandCheckRunner, CommandInstaller,
    Downloader, HttpDownloader, InstallReport, RunSummary, SourceCache,
};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument, warn};

use super::planner::{prepare_run, PreparedRun};

const EVENT_CHANNEL_SIZE: usize = 256;

fn join_error(stage: &str, e: tokio::task::JoinError) -> RevcheckError {
    RevcheckError::Generic(format!("{stage} task failed: {e}"))
}

async fn install_dependencies(
    prepared: &PreparedRun,
    config: &Config,
    downloader: Arc<dyn Downloader>,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> Result<InstallReport> {
    let _ = event_tx.send(PipelineEvent::PhaseStarted {
        phase: Phase::Installing,
    });
    if prepared.plan.to_install.is_empty() {
        return Ok(InstallReport::default());
    }

    let installer = CommandInstaller::new(
        config.tool_command.clone(),
        downloader,
        config.artifact_cache_dir(),
        prepared.search_path.clone(),
    );
    let to_install = prepared.plan.to_install.clone();
    let snapshot = Arc::clone(&prepared.binary_snapshot);
    let library = config.library_dir().to_path_buf();
    let tx = event_tx.clone();
    let report = tokio::task::spawn_blocking(move || {
        install(&to_install, &snapshot, &library, &installer, &tx)
    })
    .await
    .map_err(|e| join_error("Install", e))?;

    for (name, reason) in &report.failed {
        warn!("Dependency {} is unavailable for checks: {}", name, reason);
    }
    Ok(report)
}

async fn run_stages(
    targets: &[String],
    config: &Config,
    results_dir: PathBuf,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> Result<RunSummary> {
    let client = revcheck_net::build_http_client()?;
    let prepared = prepare_run(targets, config, &client, event_tx).await?;

    let downloader: Arc<dyn Downloader> =
        Arc::new(HttpDownloader::new(client, Handle::current()));
    install_dependencies(&prepared, config, Arc::clone(&downloader), event_tx).await?;

    let _ = event_tx.send(PipelineEvent::PhaseStarted {
        phase: Phase::Checking,
    });
    let ctx = Arc::new(CheckContext {
        source_snapshot: Arc::clone(&prepared.source_snapshot),
        source_cache: Arc::new(SourceCache::new(config.cache_dir(), downloader)),
        runner: Arc::new(CommandCheckRunner::new(config.tool_command.clone())),
        options: CheckOptions::default(),
        search_path: prepared.search_path.clone(),
        results_dir,
        event_tx: event_tx.clone(),
    });
    let targets = targets.to_vec();
    let concurrency = config.concurrency;
    tokio::task::spawn_blocking(move || run_all(&targets, concurrency, ctx))
        .await
        .map_err(|e| join_error("Check scheduler", e))?
}

/// Runs the whole pipeline: metadata, resolution, planning, dependency
/// installation, then one check per target. Per-package problems are
/// recorded in the summary; only setup and metadata errors are returned.
#[instrument(skip_all, fields(targets = ?targets))]
pub async fn run_check_pipeline(targets: &[String], config: &Config) -> Result<RunSummary> {
    config.validate()?;
    config.ensure_dirs()?;
    let results_dir = config.prepare_results_dir()?;
    debug!("Results will be written to {}", results_dir.display());

    let cpus = num_cpus::get();
    if config.concurrency > cpus {
        warn!(
            "Requested {} concurrent checks but only {} CPUs are available",
            config.concurrency, cpus
        );
    }

    let (event_tx, event_rx) = broadcast::channel::<PipelineEvent>(EVENT_CHANNEL_SIZE);
    let status_handle = tokio::spawn(crate::cli::status::handle_events(event_rx));

    let result = run_stages(targets, config, results_dir, &event_tx).await;
    if let Err(e) = &result {
        error!("Pipeline aborted: {}", e);
        let _ = event_tx.send(PipelineEvent::LogError {
            message: format!("Pipeline aborted: {e}"),
        });
    }

    drop(event_tx);
    if let Err(join_err) = status_handle.await {
        error!("Status task join error: {}", join_err);
    }
    result
}
