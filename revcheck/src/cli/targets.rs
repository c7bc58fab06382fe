// revcheck/src/cli/targets.rs
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use revcheck_common::error::{Result, RevcheckError};
use tracing::debug;

/// Names from the command line followed by names from `file`.
///
/// The file holds one name per line; blank lines and `#` comments are
/// ignored. Repeated names keep their first position. An empty result is
/// an error.
pub fn collect_targets(names: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut all: Vec<String> = names.iter().map(|n| n.trim().to_string()).collect();
    if let Some(path) = file {
        let text = fs::read_to_string(path).map_err(|e| {
            RevcheckError::IoError(format!("Failed to read targets file {}: {e}", path.display()))
        })?;
        all.extend(
            text.lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    let targets: Vec<String> = all
        .into_iter()
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect();
    if targets.is_empty() {
        return Err(RevcheckError::Config(
            "no target packages given".to_string(),
        ));
    }
    debug!("{} target packages", targets.len());
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("targets.txt");
        fs::write(&file, "# downstream\nB\n\nC  # flaky\nA\n").unwrap();
        let names = vec!["A".to_string(), "B".to_string()];
        let targets = collect_targets(&names, Some(&file)).unwrap();
        assert_eq!(targets, vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_target_list_is_rejected() {
        assert!(matches!(
            collect_targets(&[], None),
            Err(RevcheckError::Config(_))
        ));
    }
}
