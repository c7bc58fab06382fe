// revcheck-core/src/pipeline/mod.rs
pub mod engine;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use revcheck_common::model::MetadataSnapshot;
use revcheck_common::pipeline::{CheckTask, PipelineEvent};
use tokio::sync::broadcast;

use crate::check::{CheckOptions, CheckRunner};
use crate::fetch::SourceCache;
use crate::libpath::LibrarySearchPath;

pub use engine::run_all;

/// Everything a check worker needs. Shared read-only between workers.
pub struct CheckContext {
    pub source_snapshot: Arc<MetadataSnapshot>,
    pub source_cache: Arc<SourceCache>,
    pub runner: Arc<dyn CheckRunner>,
    pub options: CheckOptions,
    pub search_path: LibrarySearchPath,
    pub results_dir: PathBuf,
    pub event_tx: broadcast::Sender<PipelineEvent>,
}

/// Outcome of a whole check run, one task per target in target order.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub results_dir: PathBuf,
    pub tasks: Vec<CheckTask>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_skipped()).count()
    }
}
