// revcheck-core/src/check.rs
use std::path::{Path, PathBuf};

use revcheck_common::error::{Result, RevcheckError};
use tracing::debug;

use crate::libpath::LibrarySearchPath;
use crate::process::{run_command, CommandSpec};

/// Flags passed to every check. The defaults skip the manual and vignette
/// builds and test only the native architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub non_interactive: bool,
    pub build_docs: bool,
    pub single_arch: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            non_interactive: true,
            build_docs: false,
            single_arch: true,
        }
    }
}

impl CheckOptions {
    pub fn to_args(&self) -> Vec<&'static str> {
        let mut args = Vec::new();
        if !self.build_docs {
            args.push("--no-manual");
            args.push("--no-build-vignettes");
        }
        if self.single_arch {
            args.push("--no-multiarch");
        }
        args
    }

    /// Environment for the check process.
    pub fn envs(&self) -> Vec<(&'static str, &'static str)> {
        if self.non_interactive {
            vec![("R_INTERACTIVE", "FALSE")]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckRequest<'a> {
    pub name: &'a str,
    pub archive: &'a Path,
    pub options: CheckOptions,
    /// Scratch directory owned by this check.
    pub workdir: &'a Path,
    pub search_path: &'a LibrarySearchPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub log: String,
}

/// Runs the external validation tool on one source archive.
///
/// An `Err` means the tool could not be run at all; a tool that ran and
/// reported problems returns `Ok` with `success == false`.
pub trait CheckRunner: Send + Sync {
    fn run_check(&self, request: &CheckRequest<'_>) -> Result<CheckResult>;
}

pub struct CommandCheckRunner {
    tool_command: String,
}

impl CommandCheckRunner {
    pub fn new(tool_command: impl Into<String>) -> Self {
        Self {
            tool_command: tool_command.into(),
        }
    }

    fn command_for(&self, request: &CheckRequest<'_>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.tool_command)
            .args(["CMD", "check"])
            .args(request.options.to_args())
            .arg("-o")
            .arg(request.workdir.display().to_string())
            .arg(request.archive.display().to_string())
            .cwd(PathBuf::from(request.workdir))
            .search_path(request.search_path);
        for (key, value) in request.options.envs() {
            spec = spec.env(key, value);
        }
        spec
    }
}

impl CheckRunner for CommandCheckRunner {
    fn run_check(&self, request: &CheckRequest<'_>) -> Result<CheckResult> {
        debug!("Checking {} in {}", request.name, request.workdir.display());
        let output = run_command(&self.command_for(request))
            .map_err(|e| RevcheckError::CheckInvocation(request.name.to_string(), e.to_string()))?;
        Ok(CheckResult {
            success: output.success,
            exit_code: output.exit_code,
            log: output.log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags() {
        assert_eq!(
            CheckOptions::default().to_args(),
            vec!["--no-manual", "--no-build-vignettes", "--no-multiarch"]
        );
        let docs = CheckOptions {
            build_docs: true,
            single_arch: false,
            ..Default::default()
        };
        assert!(docs.to_args().is_empty());
    }

    #[test]
    fn command_targets_workdir() {
        let search_path = LibrarySearchPath::new([PathBuf::from("/lib")]);
        let request = CheckRequest {
            name: "A",
            archive: Path::new("/cache/A_1.0.tar.gz"),
            options: CheckOptions::default(),
            workdir: Path::new("/results/A.check"),
            search_path: &search_path,
        };
        let spec = CommandCheckRunner::new("R").command_for(&request);
        assert_eq!(spec.program, "R");
        assert_eq!(
            spec.args,
            vec![
                "CMD",
                "check",
                "--no-manual",
                "--no-build-vignettes",
                "--no-multiarch",
                "-o",
                "/results/A.check",
                "/cache/A_1.0.tar.gz"
            ]
        );
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/results/A.check")));
        assert_eq!(spec.search_path, Some(search_path));
        assert!(spec
            .envs
            .contains(&("R_INTERACTIVE".to_string(), "FALSE".to_string())));
    }

    #[test]
    fn missing_tool_is_invocation_error() {
        let dir = tempfile::tempdir().unwrap();
        let search_path = LibrarySearchPath::default();
        let request = CheckRequest {
            name: "A",
            archive: Path::new("A_1.0.tar.gz"),
            options: CheckOptions::default(),
            workdir: dir.path(),
            search_path: &search_path,
        };
        let err = CommandCheckRunner::new("revcheck-no-such-tool")
            .run_check(&request)
            .unwrap_err();
        assert!(matches!(err, RevcheckError::CheckInvocation(ref n, _) if n == "A"));
    }
}
