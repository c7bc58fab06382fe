// revcheck-core/src/installed.rs
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use revcheck_common::model::description::parse_description;
use revcheck_common::model::PackageVersion;
use tracing::{debug, warn};

use crate::process::{run_command, CommandSpec};

/// Installed package versions keyed by name.
pub type InstalledSet = BTreeMap<String, PackageVersion>;

const DESCRIPTION_FILE: &str = "DESCRIPTION";

fn handle_dir_entry(res: io::Result<fs::DirEntry>, dir: &Path) -> Option<fs::DirEntry> {
    match res {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Error reading entry in {}: {}", dir.display(), e);
            None
        }
    }
}

/// Reads the package installed at `package_dir`, if it is one.
pub fn read_installed_package(package_dir: &Path) -> Option<(String, PackageVersion)> {
    let description = package_dir.join(DESCRIPTION_FILE);
    let text = fs::read_to_string(&description).ok()?;
    let fields = match parse_description(&text) {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Ignoring installed package at {}: {}", package_dir.display(), e);
            return None;
        }
    };
    let name = fields.package_name()?.to_string();
    match PackageVersion::parse(fields.version.as_deref()?) {
        Ok(version) => Some((name, version)),
        Err(e) => {
            warn!(
                "Ignoring installed package at {}: {}",
                package_dir.display(),
                e
            );
            None
        }
    }
}

/// Scans every library directory, in order. When a package is installed in
/// more than one, the first directory's copy is the one that gets loaded,
/// so it is the one reported.
pub fn read_installed(library_dirs: &[PathBuf]) -> InstalledSet {
    let mut installed = InstalledSet::new();
    for dir in library_dirs {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping library {}: {}", dir.display(), e);
                continue;
            }
        };
        for entry in entries.filter_map(|res| handle_dir_entry(res, dir)) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some((name, version)) = read_installed_package(&path) {
                installed.entry(name).or_insert(version);
            }
        }
    }
    debug!(
        "Found {} installed packages across {} libraries",
        installed.len(),
        library_dirs.len()
    );
    installed
}

/// The tool's bundled library, `<home>/library`, where `<home>` is what
/// `<tool> RHOME` prints. `None` when the tool cannot be asked.
pub fn system_library(tool_command: &str) -> Option<PathBuf> {
    let output = match run_command(&CommandSpec::new(tool_command).arg("RHOME")) {
        Ok(output) if output.success => output,
        Ok(output) => {
            debug!("{} RHOME exited with {:?}", tool_command, output.exit_code);
            return None;
        }
        Err(e) => {
            debug!("Could not ask {} for its home: {}", tool_command, e);
            return None;
        }
    };
    let home = output.log.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(Path::new(home).join("library"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install_fake(lib: &Path, name: &str, version: &str) {
        let dir = lib.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(DESCRIPTION_FILE),
            format!("Package: {name}\nVersion: {version}\nTitle: Test\n"),
        )
        .unwrap();
    }

    #[test]
    fn first_library_wins() {
        let private = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        install_fake(private.path(), "A", "2.0");
        install_fake(site.path(), "A", "1.0");
        install_fake(site.path(), "B", "0.5-1");
        fs::create_dir_all(site.path().join("not-a-package")).unwrap();

        let installed = read_installed(&[private.path().to_path_buf(), site.path().to_path_buf()]);
        assert_eq!(installed.len(), 2);
        assert_eq!(installed["A"].as_str(), "2.0");
        assert_eq!(installed["B"].as_str(), "0.5-1");
    }

    #[test]
    fn missing_library_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let installed = read_installed(&[dir.path().join("absent")]);
        assert!(installed.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn system_library_comes_from_tool_home() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-r");
        fs::write(&tool, "#!/bin/sh\necho /opt/fake/R\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(
            system_library(&tool.display().to_string()),
            Some(PathBuf::from("/opt/fake/R/library"))
        );
        assert_eq!(system_library("revcheck-definitely-not-a-program"), None);
    }
}
