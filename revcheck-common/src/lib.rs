// revcheck-common/src/lib.rs
pub mod config;
pub mod dependency;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use error::{Result, RevcheckError};
pub use model::{MetadataSnapshot, PackageForm, PackageRecord, PackageVersion};
