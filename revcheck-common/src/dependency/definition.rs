// revcheck-common/src/dependency/definition.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::DescriptionFields;

/// The language runtime itself appears in `Depends` but is not a package.
pub const LANGUAGE_PSEUDO_PACKAGE: &str = "R";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationKind {
    Strong,
    Weak,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => f.write_str("strong"),
            Self::Weak => f.write_str("weak"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    pub kind: RelationKind,
}

impl DependencySpec {
    pub fn strong(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Strong,
        }
    }

    pub fn weak(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Weak,
        }
    }

    /// Parses one declaration field such as `"R (>= 3.5), foo (>= 1.2), bar"`.
    pub fn parse_field(value: &str, kind: RelationKind) -> Vec<Self> {
        value
            .split(',')
            .filter_map(|entry| {
                let name = entry.split('(').next().unwrap_or("").trim();
                if name.is_empty() || name == LANGUAGE_PSEUDO_PACKAGE {
                    None
                } else {
                    Some(Self {
                        name: name.to_string(),
                        kind,
                    })
                }
            })
            .collect()
    }

    /// Collects every strong and weak declaration of an index record.
    ///
    /// A name declared under both kinds is kept once, as strong.
    pub fn from_fields(fields: &DescriptionFields) -> Vec<Self> {
        let mut specs: Vec<Self> = Vec::new();
        for (value, kind) in fields.relation_fields() {
            let Some(value) = value else {
                continue;
            };
            for spec in Self::parse_field(value, kind) {
                match specs.iter_mut().find(|s| s.name == spec.name) {
                    Some(existing) => {
                        if spec.kind < existing.kind {
                            existing.kind = spec.kind;
                        }
                    }
                    None => specs.push(spec),
                }
            }
        }
        specs
    }
}

pub trait DependencyExt {
    fn of_kind(&self, kind: RelationKind) -> Vec<&DependencySpec>;
    fn strong(&self) -> Vec<&DependencySpec>;
}

impl DependencyExt for [DependencySpec] {
    fn of_kind(&self, kind: RelationKind) -> Vec<&DependencySpec> {
        self.iter().filter(|dep| dep.kind == kind).collect()
    }

    fn strong(&self) -> Vec<&DependencySpec> {
        self.of_kind(RelationKind::Strong)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::description::parse_index;

    #[test]
    fn strips_constraints_and_language_requirement() {
        let specs = DependencySpec::parse_field(
            "R (>= 3.5.0), methods,  Rcpp (>= 1.0.1)\n, ",
            RelationKind::Strong,
        );
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["methods", "Rcpp"]);
    }

    #[test]
    fn strong_wins_over_weak_for_duplicates() {
        let fields = &parse_index(
            "Package: A\nVersion: 1\nSuggests: B, C\nImports: B\nLinkingTo: D\nEnhances: E\n",
        )
        .unwrap()[0];
        let specs = DependencySpec::from_fields(fields);
        assert_eq!(specs.len(), 3);
        assert!(specs.contains(&DependencySpec::strong("B")));
        assert!(specs.contains(&DependencySpec::weak("C")));
        assert!(specs.contains(&DependencySpec::strong("D")));
        assert_eq!(specs.strong().len(), 2);
    }
}
