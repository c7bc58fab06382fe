// revcheck-common/src/model/version.rs
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, RevcheckError};

/// Package version as published by the repository: non-negative integers
/// separated by `.` or `-` (`1.2-3`, `0.10.1`).
///
/// Ordering is numeric per component; when one version is a prefix of the
/// other the shorter one is older (`1.2 < 1.2.0`).
#[derive(Debug, Clone)]
pub struct PackageVersion {
    components: Vec<u64>,
    original: String,
}

impl PackageVersion {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RevcheckError::Version("empty version string".to_string()));
        }
        let components = trimmed
            .split(['.', '-'])
            .map(|part| {
                part.parse::<u64>().map_err(|e| {
                    RevcheckError::Version(format!(
                        "Failed to parse version '{trimmed}' (component '{part}'): {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            components,
            original: trimmed.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec<u64> ordering is lexicographic and shorter-prefix-first.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for PackageVersion {
    type Err = RevcheckError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PackageVersion::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PackageVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s).unwrap()
    }

    #[test]
    fn orders_numerically_not_lexically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("0.3-12") > v("0.3-2"));
        assert!(v("1.1") > v("1.0"));
    }

    #[test]
    fn dash_and_dot_are_equivalent_separators() {
        assert_eq!(v("1.2-3").cmp(&v("1.2.3")), Ordering::Equal);
        assert_eq!(v("1.2-3").to_string(), "1.2-3");
    }

    #[test]
    fn prefix_is_older() {
        assert!(v("1.2") < v("1.2.0"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(PackageVersion::parse("").is_err());
        assert!(PackageVersion::parse("1.x").is_err());
        assert!(PackageVersion::parse("1..2").is_err());
    }
}
