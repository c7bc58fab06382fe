// revcheck-common/src/model/snapshot.rs
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::description::{parse_index, DescriptionFields};
use super::version::PackageVersion;
use crate::dependency::DependencySpec;
use crate::error::Result;

/// Which flavor of index a snapshot is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageForm {
    Source,
    Binary {
        platform: String,
        tool_version: String,
    },
}

impl PackageForm {
    /// Directory holding the index and the archives of this form.
    pub fn contrib_url(&self, repository: &str) -> String {
        let repository = repository.trim_end_matches('/');
        match self {
            Self::Source => format!("{repository}/src/contrib"),
            Self::Binary {
                platform,
                tool_version,
            } => format!("{repository}/bin/{platform}/contrib/{tool_version}"),
        }
    }

    pub fn index_url(&self, repository: &str) -> String {
        format!("{}/PACKAGES", self.contrib_url(repository))
    }

    pub fn archive_extension(&self) -> &'static str {
        match self {
            Self::Source => "tar.gz",
            Self::Binary { platform, .. } if platform.starts_with("windows") => "zip",
            Self::Binary { platform, .. } if platform.starts_with("macosx") => "tgz",
            Self::Binary { .. } => "tar.gz",
        }
    }
}

impl fmt::Display for PackageForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Binary {
                platform,
                tool_version,
            } => write!(f, "binary ({platform}, {tool_version})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: PackageVersion,
    pub dependencies: Vec<DependencySpec>,
    pub source_url: String,
    /// Artifact to install for the snapshot's form. For a source snapshot
    /// this is the source tarball.
    pub binary_url: Option<String>,
    pub repository: String,
}

impl PackageRecord {
    /// Builds a record from one index paragraph. Returns `None` (with a
    /// warning) for paragraphs lacking a usable name or version.
    pub fn from_fields(
        fields: &DescriptionFields,
        repository: &str,
        form: &PackageForm,
    ) -> Option<Self> {
        let Some(name) = fields.package_name() else {
            warn!("Skipping index entry without a Package field from {}", repository);
            return None;
        };
        let name = name.to_string();
        let Some(raw_version) = fields.version.as_deref() else {
            warn!("Skipping index entry '{}' from {}: no Version field", name, repository);
            return None;
        };
        let version = match PackageVersion::parse(raw_version) {
            Ok(v) => v,
            Err(e) => {
                warn!("Skipping index entry '{}' from {}: {}", name, repository, e);
                return None;
            }
        };

        let default_file = |ext: &str| format!("{name}_{version}.{ext}");
        let named_file = fields.file.as_deref().map(|f| f.trim().to_string());
        let subpath = fields
            .path
            .as_deref()
            .map(|p| format!("{}/", p.trim().trim_matches('/')))
            .unwrap_or_default();

        let source_file = match form {
            PackageForm::Source => named_file.clone().unwrap_or_else(|| default_file("tar.gz")),
            PackageForm::Binary { .. } => default_file("tar.gz"),
        };
        let source_url = format!(
            "{}/{}{}",
            PackageForm::Source.contrib_url(repository),
            subpath,
            source_file
        );

        let binary_url = match form {
            PackageForm::Source => Some(source_url.clone()),
            PackageForm::Binary { .. } => {
                let file = named_file.unwrap_or_else(|| default_file(form.archive_extension()));
                Some(format!("{}/{}{}", form.contrib_url(repository), subpath, file))
            }
        };

        Some(Self {
            dependencies: DependencySpec::from_fields(fields),
            name,
            version,
            source_url,
            binary_url,
            repository: repository.to_string(),
        })
    }
}

/// Point-in-time view of the packages available from one or more
/// repositories. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct MetadataSnapshot {
    records: HashMap<String, PackageRecord>,
}

impl MetadataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `PACKAGES` index published by `repository`.
    ///
    /// Within one index the first entry of a name wins. Unusable entries
    /// are skipped; only an index that cannot be parsed at all is an error.
    pub fn from_index(repository: &str, form: &PackageForm, index_text: &str) -> Result<Self> {
        let mut snapshot = Self::new();
        let mut skipped = 0usize;
        for fields in parse_index(index_text)? {
            match PackageRecord::from_fields(&fields, repository, form) {
                Some(record) => {
                    snapshot.insert_if_absent(record);
                }
                None => skipped += 1,
            }
        }
        debug!(
            "Parsed {} {} index entries from {} ({} skipped)",
            snapshot.len(),
            form,
            repository,
            skipped
        );
        Ok(snapshot)
    }

    pub fn from_records(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        let mut snapshot = Self::new();
        for record in records {
            snapshot.insert_if_absent(record);
        }
        snapshot
    }

    /// Adds every record of `other` whose name is not yet present.
    pub fn merge(&mut self, other: MetadataSnapshot) {
        for (_, record) in other.records {
            self.insert_if_absent(record);
        }
    }

    fn insert_if_absent(&mut self, record: PackageRecord) -> bool {
        if self.records.contains_key(&record.name) {
            return false;
        }
        self.records.insert(record.name.clone(), record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
