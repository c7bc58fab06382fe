use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use crossbeam_channel::{bounded, unbounded};
use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::pipeline::{CheckJob, CheckOutcome, CheckTask, PipelineEvent};
use threadpool::ThreadPool;
use tracing::{debug, error, info, instrument, warn};

use super::{worker, CheckContext, RunSummary};
use crate::report;

/// Jobs queued ahead of the workers, per worker.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

fn jobs_for(targets: &[String]) -> Vec<CheckJob> {
    targets
        .iter()
        .enumerate()
        .map(|(i, name)| CheckJob {
            index: i + 1,
            name: name.clone(),
        })
        .collect()
}

/// Checks every target and records one task per target.
///
/// With `concurrency == 1` the jobs run in target order on the calling
/// thread. Otherwise a fixed pool of workers drains a bounded queue that is
/// filled in target order; tasks complete in any order but are returned
/// sorted by index. Blocks until every job is finished.
#[instrument(skip(targets, ctx), fields(targets = targets.len()))]
pub fn run_all(targets: &[String], concurrency: usize, ctx: Arc<CheckContext>) -> Result<RunSummary> {
    if concurrency == 0 {
        return Err(RevcheckError::Config(
            "concurrency must be a positive integer".to_string(),
        ));
    }
    let start_time = Instant::now();
    let jobs = jobs_for(targets);
    let _ = ctx.event_tx.send(PipelineEvent::PipelineStarted {
        total_jobs: jobs.len(),
        concurrency,
    });

    let mut tasks = if concurrency == 1 {
        run_sequential(jobs.clone(), &ctx)
    } else {
        run_pooled(jobs.clone(), concurrency, &ctx)
    };
    fill_missing(&jobs, &mut tasks, &ctx);

    let summary = RunSummary {
        results_dir: ctx.results_dir.clone(),
        tasks,
    };
    if let Err(e) = report::write_summary(&ctx.results_dir, &summary.tasks) {
        error!("Could not write run summary: {}", e);
    }
    let duration = start_time.elapsed();
    info!(
        "Checked {} packages in {:.1}s: {} passed, {} failed, {} skipped",
        summary.tasks.len(),
        duration.as_secs_f64(),
        summary.passed(),
        summary.failed(),
        summary.skipped()
    );
    let _ = ctx.event_tx.send(PipelineEvent::PipelineFinished {
        duration_secs: duration.as_secs_f64(),
        passed: summary.passed(),
        failed: summary.failed(),
        skipped: summary.skipped(),
        results_dir: summary.results_dir.clone(),
    });
    Ok(summary)
}

fn run_sequential(jobs: Vec<CheckJob>, ctx: &CheckContext) -> Vec<CheckTask> {
    jobs.into_iter()
        .map(|job| worker::execute_check_job(job, ctx))
        .collect()
}

fn run_pooled(jobs: Vec<CheckJob>, concurrency: usize, ctx: &Arc<CheckContext>) -> Vec<CheckTask> {
    let num_workers = concurrency.min(jobs.len()).max(1);
    let pool = ThreadPool::with_name("revcheck-check".to_string(), num_workers);
    let (job_tx, job_rx) = bounded::<CheckJob>(num_workers * QUEUE_DEPTH_PER_WORKER);
    let (task_tx, task_rx) = unbounded::<CheckTask>();
    debug!("Check worker pool started with {} workers.", num_workers);

    for worker_id in 0..num_workers {
        let job_rx = job_rx.clone();
        let task_tx = task_tx.clone();
        let ctx = Arc::clone(ctx);
        pool.execute(move || {
            for job in job_rx {
                debug!("[worker {}] Picked up {} ({})", worker_id, job.name, job.index);
                let task = worker::execute_check_job(job, &ctx);
                if task_tx.send(task).is_err() {
                    break;
                }
            }
            debug!("[worker {}] Queue drained.", worker_id);
        });
    }
    drop(job_rx);
    drop(task_tx);

    for job in jobs {
        if let Err(e) = job_tx.send(job) {
            error!("Check queue closed early; {} not scheduled", e.0.name);
            break;
        }
    }
    drop(job_tx);

    let tasks: Vec<CheckTask> = task_rx.iter().collect();
    pool.join();
    tasks
}

/// Sorts tasks by index and adds a failed task for every job that produced
/// none, so each target is recorded exactly once.
fn fill_missing(jobs: &[CheckJob], tasks: &mut Vec<CheckTask>, ctx: &CheckContext) {
    let mut by_index: BTreeMap<usize, CheckTask> = BTreeMap::new();
    for task in tasks.drain(..) {
        if by_index.contains_key(&task.index) {
            warn!("Duplicate result for {} ({}) ignored", task.name, task.index);
            continue;
        }
        by_index.insert(task.index, task);
    }
    for job in jobs {
        if by_index.contains_key(&job.index) {
            continue;
        }
        warn!("No result recorded for {}; marking it failed", job.name);
        let now = Utc::now();
        let outcome = CheckOutcome::Failed("worker exited before reporting".to_string());
        if let Err(e) = report::write_result(&ctx.results_dir, job.index, &job.name, 0.0) {
            error!("[{}] Could not write timing record: {}", job.name, e);
        }
        by_index.insert(
            job.index,
            CheckTask {
                index: job.index,
                name: job.name.clone(),
                started_at: now,
                finished_at: now,
                elapsed_secs: 0.0,
                outcome,
            },
        );
    }
    tasks.extend(by_index.into_values());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_are_numbered_from_one() {
        let jobs = jobs_for(&["a".to_string(), "b".to_string()]);
        assert_eq!(jobs[0], CheckJob { index: 1, name: "a".into() });
        assert_eq!(jobs[1], CheckJob { index: 2, name: "b".into() });
    }
}
