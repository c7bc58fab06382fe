// revcheck-common/src/model/mod.rs
pub mod description;
pub mod snapshot;
pub mod version;

pub use description::DescriptionFields;
pub use snapshot::{MetadataSnapshot, PackageForm, PackageRecord};
pub use version::PackageVersion;
