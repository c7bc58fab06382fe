// revcheck-core/src/report.rs
//! On-disk artifacts of a check run.
//!
//! Each target gets its own files, so concurrent workers never write to the
//! same path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::pipeline::{CheckOutcome, CheckTask};
use serde::Serialize;
use tracing::debug;

pub const TIMING_EXTENSION: &str = "timing";
pub const CHECK_DIR_EXTENSION: &str = "check";
pub const STATUS_FILE: &str = "status";
pub const CHECK_LOG_FILE: &str = "check.log";
pub const SUMMARY_FILE: &str = "summary.json";

/// One line of timing output: `<index> <name> <elapsed>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub index: usize,
    pub name: String,
    pub elapsed_secs: f64,
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:.1}", self.index, self.name, self.elapsed_secs)
    }
}

pub fn timing_path(check_dir: &Path, name: &str) -> PathBuf {
    check_dir.join(format!("{name}.{TIMING_EXTENSION}"))
}

/// Scratch directory of one target's check.
pub fn workdir_path(results_dir: &Path, name: &str) -> PathBuf {
    results_dir.join(format!("{name}.{CHECK_DIR_EXTENSION}"))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| RevcheckError::IoError(format!("Failed to write {}: {e}", path.display())))
}

/// Writes the timing record of one target, replacing any earlier one.
pub fn write_result(check_dir: &Path, index: usize, name: &str, elapsed_secs: f64) -> Result<PathBuf> {
    let record = ResultRecord {
        index,
        name: name.to_string(),
        elapsed_secs: elapsed_secs.max(0.0),
    };
    let path = timing_path(check_dir, name);
    write_file(&path, &format!("{record}\n"))?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Records the outcome and captured output inside a target's workdir.
pub fn write_status(workdir: &Path, outcome: &CheckOutcome, log: &str) -> Result<()> {
    fs::create_dir_all(workdir).map_err(|e| {
        RevcheckError::IoError(format!("Failed to create {}: {e}", workdir.display()))
    })?;
    write_file(&workdir.join(STATUS_FILE), &format!("{outcome}\n"))?;
    write_file(&workdir.join(CHECK_LOG_FILE), log)
}

#[derive(Serialize)]
struct Summary<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    passed: usize,
    failed: usize,
    skipped: usize,
    tasks: &'a [CheckTask],
}

/// Writes `summary.json` listing every task in target order.
pub fn write_summary(results_dir: &Path, tasks: &[CheckTask]) -> Result<PathBuf> {
    let summary = Summary {
        generated_at: chrono::Utc::now(),
        passed: tasks.iter().filter(|t| t.outcome.is_passed()).count(),
        failed: tasks.iter().filter(|t| t.outcome.is_failed()).count(),
        skipped: tasks.iter().filter(|t| t.outcome.is_skipped()).count(),
        tasks,
    };
    let json = serde_json::to_string_pretty(&summary)?;
    let path = results_dir.join(SUMMARY_FILE);
    write_file(&path, &json)?;
    Ok(path)
}
