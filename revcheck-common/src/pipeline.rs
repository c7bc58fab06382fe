// revcheck-common/src/pipeline.rs
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RevcheckError;

/// A unit of work for the check scheduler: validate one target package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckJob {
    /// 1-based position in the target list.
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl CheckOutcome {
    pub const NO_SOURCE: &'static str = "no source archive available";

    pub fn no_source() -> Self {
        Self::Skipped(Self::NO_SOURCE.to_string())
    }

    pub fn failed(err: &RevcheckError) -> Self {
        Self::Failed(err.to_string())
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed(reason) => write!(f, "FAILED: {reason}"),
            Self::Skipped(reason) => write!(f, "SKIPPED: {reason}"),
        }
    }
}

/// A finalized check task. Never retried within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTask {
    pub index: usize,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub outcome: CheckOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    FetchingMetadata,
    Resolving,
    Planning,
    Installing,
    Checking,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FetchingMetadata => "Fetching package metadata",
            Self::Resolving => "Resolving dependencies",
            Self::Planning => "Planning dependency installation",
            Self::Installing => "Installing dependencies",
            Self::Checking => "Checking packages",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    PhaseStarted {
        phase: Phase,
    },
    PipelineStarted {
        total_jobs: usize,
        concurrency: usize,
    },
    PipelineFinished {
        duration_secs: f64,
        passed: usize,
        failed: usize,
        skipped: usize,
        results_dir: PathBuf,
    },
    InstallStarted {
        name: String,
    },
    InstallFinished {
        name: String,
    },
    InstallFailed {
        name: String,
        error: String,
    },
    DownloadFinished {
        name: String,
        path: PathBuf,
    },
    CheckStarted {
        index: usize,
        name: String,
    },
    CheckFinished {
        index: usize,
        name: String,
        outcome: CheckOutcome,
        elapsed_secs: f64,
    },
    LogInfo {
        message: String,
    },
    LogWarn {
        message: String,
    },
    LogError {
        message: String,
    },
}

impl PipelineEvent {
    pub fn install_failed(name: String, error: &RevcheckError) -> Self {
        PipelineEvent::InstallFailed {
            name,
            error: error.to_string(),
        }
    }
}
