// revcheck-common/src/model/description.rs
//! Field sets of repository `PACKAGES` indexes and installed `DESCRIPTION`
//! files. Both use the RFC 822 style paragraph format.

use serde::Deserialize;

use crate::dependency::RelationKind;
use crate::error::{Result, RevcheckError};

/// The fields of one package paragraph that revcheck reads. Everything
/// else in the paragraph is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescriptionFields {
    pub package: Option<String>,
    pub version: Option<String>,
    pub depends: Option<String>,
    pub imports: Option<String>,
    pub linking_to: Option<String>,
    pub suggests: Option<String>,
    /// Subdirectory of the contrib directory holding the archive.
    pub path: Option<String>,
    /// Archive file name when it differs from `<name>_<version>.<ext>`.
    pub file: Option<String>,
}

impl DescriptionFields {
    pub fn package_name(&self) -> Option<&str> {
        self.package
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Declaration fields paired with their relation kind, strong first.
    /// `Enhances` is not a dependency and is never read.
    pub fn relation_fields(&self) -> [(Option<&str>, RelationKind); 4] {
        [
            (self.depends.as_deref(), RelationKind::Strong),
            (self.imports.as_deref(), RelationKind::Strong),
            (self.linking_to.as_deref(), RelationKind::Strong),
            (self.suggests.as_deref(), RelationKind::Weak),
        ]
    }
}

/// The parser wants `\n` line endings and exactly one empty line between
/// paragraphs.
fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_break = false;
    for line in input.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            pending_break = !out.is_empty();
            continue;
        }
        if pending_break {
            out.push('\n');
            pending_break = false;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Parses every paragraph of a `PACKAGES` index.
pub fn parse_index(input: &str) -> Result<Vec<DescriptionFields>> {
    let text = normalize(input);
    if text.is_empty() {
        return Ok(Vec::new());
    }
    rfc822_like::from_str(&text)
        .map_err(|e| RevcheckError::Parse("PACKAGES index", e.to_string()))
}

/// Parses an installed package's `DESCRIPTION` file: its first paragraph.
pub fn parse_description(input: &str) -> Result<DescriptionFields> {
    let text = normalize(input);
    if text.is_empty() {
        return Err(RevcheckError::Parse("DESCRIPTION", "empty file".to_string()));
    }
    let paragraphs: Vec<DescriptionFields> = rfc822_like::from_str(&text)
        .map_err(|e| RevcheckError::Parse("DESCRIPTION", e.to_string()))?;
    paragraphs
        .into_iter()
        .next()
        .ok_or_else(|| RevcheckError::Parse("DESCRIPTION", "no fields".to_string()))
}
