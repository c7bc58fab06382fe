// revcheck-core/src/lib.rs

pub mod check;
pub mod download;
pub mod fetch;
pub mod install;
pub mod installed;
pub mod libpath;
pub mod metadata;
pub mod pipeline;
pub mod plan;
pub mod process;
pub mod report;

// Re-export key types for the CLI crate
pub use check::{CheckOptions, CheckRunner, CommandCheckRunner};
pub use download::{Downloader, HttpDownloader};
pub use fetch::{SourceCache, SourceFetch};
pub use install::{install, CommandInstaller, InstallReport, PackageInstaller};
pub use installed::{read_installed, system_library, InstalledSet};
pub use libpath::LibrarySearchPath;
pub use metadata::{fetch_snapshot, HttpIndexFetcher, IndexFetcher};
pub use pipeline::{run_all, CheckContext, RunSummary};
pub use plan::{plan, InstallPlan};
