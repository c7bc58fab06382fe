// revcheck-core/src/process.rs
use std::path::PathBuf;
use std::process::{Command, Stdio};

use revcheck_common::error::{Result, RevcheckError};
use tracing::{debug, error};

use crate::libpath::LibrarySearchPath;

/// A fully described external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
    pub search_path: Option<LibrarySearchPath>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            search_path: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn search_path(mut self, search_path: &LibrarySearchPath) -> Self {
        self.search_path = Some(search_path.clone());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Standard output followed by standard error.
    pub log: String,
}

impl CommandOutput {
    /// The last `n` non-empty lines of the log, for error messages.
    pub fn tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.log.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join("\n")
    }
}

/// Runs a command to completion with stdin closed, capturing its output.
/// A non-zero exit is reported through `CommandOutput::success`, not as an
/// error; only failure to launch is an error.
pub fn run_command(spec: &CommandSpec) -> Result<CommandOutput> {
    debug!(
        "Running command: {} {:?} (cwd: {:?}, envs: {:?})",
        spec.program,
        spec.args,
        spec.cwd,
        spec.envs.iter().map(|(k, _)| k).collect::<Vec<_>>()
    );
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.envs {
        cmd.env(key, value);
    }
    if let Some(search_path) = &spec.search_path {
        search_path.apply(&mut cmd)?;
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    match cmd.output() {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if output.status.success() {
                debug!("Command finished successfully.");
            } else {
                debug!("Command failed with status: {}", output.status);
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            }
            let mut log = stdout.into_owned();
            if !stderr.is_empty() {
                if !log.is_empty() && !log.ends_with('\n') {
                    log.push('\n');
                }
                log.push_str(&stderr);
            }
            Ok(CommandOutput {
                success: output.status.success(),
                exit_code: output.status.code(),
                log,
            })
        }
        Err(e) => {
            error!("Failed to execute command {}: {}", spec.program, e);
            Err(RevcheckError::CommandExec(format!("{}: {e}", spec.program)))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_and_status() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = run_command(&spec).unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.log, "out\nerr\n");
        assert_eq!(output.tail(1), "err");
    }

    #[test]
    fn passes_environment_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf '%s' \"$REVCHECK_PROBE\"; pwd"])
            .env("REVCHECK_PROBE", "value")
            .cwd(dir.path());
        let output = run_command(&spec).unwrap();
        assert!(output.success);
        assert!(output.log.starts_with("value"));
    }

    #[test]
    fn missing_program_is_an_error() {
        let spec = CommandSpec::new("revcheck-definitely-not-a-program");
        assert!(matches!(
            run_command(&spec),
            Err(RevcheckError::CommandExec(_))
        ));
    }
}
