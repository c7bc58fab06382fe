// revcheck-core/src/install/command.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::model::PackageRecord;
use tracing::debug;

use super::PackageInstaller;
use crate::download::{fetch_cached, Downloader};
use crate::libpath::LibrarySearchPath;
use crate::process::{run_command, CommandSpec};

/// Lines of installer output kept in a failure message.
const FAILURE_TAIL_LINES: usize = 20;

/// Installs through the toolchain's own `CMD INSTALL`.
pub struct CommandInstaller {
    tool_command: String,
    downloader: Arc<dyn Downloader>,
    artifact_dir: PathBuf,
    search_path: LibrarySearchPath,
}

impl CommandInstaller {
    pub fn new(
        tool_command: impl Into<String>,
        downloader: Arc<dyn Downloader>,
        artifact_dir: impl Into<PathBuf>,
        search_path: LibrarySearchPath,
    ) -> Self {
        Self {
            tool_command: tool_command.into(),
            downloader,
            artifact_dir: artifact_dir.into(),
            search_path,
        }
    }

    fn command_for(&self, archive: &Path, library: &Path) -> CommandSpec {
        CommandSpec::new(&self.tool_command)
            .args(["CMD", "INSTALL"])
            .arg(format!("--library={}", library.display()))
            .arg(archive.display().to_string())
            .search_path(&self.search_path)
    }
}

impl PackageInstaller for CommandInstaller {
    fn install_package(&self, record: &PackageRecord, library: &Path) -> Result<()> {
        let url = record.binary_url.as_deref().ok_or_else(|| {
            RevcheckError::UnsatisfiableDependency(record.name.clone())
        })?;
        let (archive, _) = fetch_cached(url, &self.artifact_dir, self.downloader.as_ref())
            .map_err(|e| RevcheckError::InstallFailure(record.name.clone(), e.to_string()))?;

        debug!("Installing {} from {}", record.name, archive.display());
        let output = run_command(&self.command_for(&archive, library))
            .map_err(|e| RevcheckError::InstallFailure(record.name.clone(), e.to_string()))?;
        if output.success {
            Ok(())
        } else {
            let status = output
                .exit_code
                .map(|c| format!("exit code {c}"))
                .unwrap_or_else(|| "terminated by signal".to_string());
            Err(RevcheckError::InstallFailure(
                record.name.clone(),
                format!("{status}\n{}", output.tail(FAILURE_TAIL_LINES)),
            ))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use revcheck_common::model::{MetadataSnapshot, PackageForm};

    use super::*;
    use crate::download::testing::FakeDownloader;

    /// A stand-in toolchain that logs its arguments and search path, and
    /// fails for archives whose name starts with `Bad`.
    fn fake_tool(dir: &Path) -> PathBuf {
        let tool = dir.join("fake-tool");
        fs::write(
            &tool,
            "#!/bin/sh\necho \"$@\" >> \"$(dirname \"$0\")/calls\"\necho \"R_LIBS=$R_LIBS\" >> \"$(dirname \"$0\")/calls\"\ncase \"$4\" in *Bad*) echo 'ERROR: compilation failed' >&2; exit 1;; esac\n",
        )
        .unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        tool
    }

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot::from_index(
            "https://repo.example",
            &PackageForm::Source,
            "Package: Good\nVersion: 1.0\n\nPackage: Bad\nVersion: 1.0\n",
        )
        .unwrap()
    }

    fn installer(dir: &Path) -> CommandInstaller {
        let downloader = Arc::new(FakeDownloader::with(&[
            ("https://repo.example/src/contrib/Good_1.0.tar.gz", b"good"),
            ("https://repo.example/src/contrib/Bad_1.0.tar.gz", b"bad"),
        ]));
        let library = dir.join("lib");
        CommandInstaller::new(
            fake_tool(dir).display().to_string(),
            downloader,
            dir.join("artifacts"),
            LibrarySearchPath::new([library]),
        )
    }

    #[test]
    fn invokes_install_with_private_library() {
        let dir = tempfile::tempdir().unwrap();
        let installer = installer(dir.path());
        let library = dir.path().join("lib");
        installer
            .install_package(snapshot().get("Good").unwrap(), &library)
            .unwrap();

        let calls = fs::read_to_string(dir.path().join("calls")).unwrap();
        let archive = dir.path().join("artifacts").join("Good_1.0.tar.gz");
        assert!(calls.contains(&format!(
            "CMD INSTALL --library={} {}",
            library.display(),
            archive.display()
        )));
        assert!(calls.contains(&format!("R_LIBS={}", library.display())));
    }

    #[test]
    fn non_zero_exit_is_install_failure() {
        let dir = tempfile::tempdir().unwrap();
        let installer = installer(dir.path());
        let err = installer
            .install_package(snapshot().get("Bad").unwrap(), &dir.path().join("lib"))
            .unwrap_err();
        match err {
            RevcheckError::InstallFailure(name, reason) => {
                assert_eq!(name, "Bad");
                assert!(reason.contains("exit code 1"));
                assert!(reason.contains("compilation failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
