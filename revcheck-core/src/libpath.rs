// revcheck-core/src/libpath.rs
//! The library search path handed to every install and check process.
//!
//! The private dependency library is prepended to whatever the invoking
//! environment already had. The value is passed explicitly to each child
//! process; the environment of this process is never modified.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use revcheck_common::error::{Result, RevcheckError};
use tracing::debug;

/// Environment variable through which the toolchain reads extra libraries.
pub const SEARCH_PATH_VAR: &str = "R_LIBS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySearchPath {
    entries: Vec<PathBuf>,
}

impl LibrarySearchPath {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut path = Self::default();
        for entry in entries {
            path.push_unique(entry);
        }
        path
    }

    /// Library directories configured by the invoking environment.
    pub fn inherited() -> Self {
        match env::var_os(SEARCH_PATH_VAR) {
            Some(value) => Self::new(env::split_paths(&value).filter(|p| !p.as_os_str().is_empty())),
            None => Self::default(),
        }
    }

    /// `private` first, then every entry of `rest` not equal to it.
    pub fn with_private(private: &Path, rest: &LibrarySearchPath) -> Self {
        let path = Self::new(
            std::iter::once(private.to_path_buf()).chain(rest.entries.iter().cloned()),
        );
        debug!("Library search path: {:?}", path.entries);
        path
    }

    fn push_unique(&mut self, entry: PathBuf) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn to_env_value(&self) -> Result<OsString> {
        env::join_paths(&self.entries).map_err(|e| {
            RevcheckError::Config(format!("Invalid library search path entry: {e}"))
        })
    }

    /// Sets the search path on a child command only.
    pub fn apply(&self, cmd: &mut Command) -> Result<()> {
        cmd.env(SEARCH_PATH_VAR, self.to_env_value()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_library_comes_first_without_duplicates() {
        let rest = LibrarySearchPath::new([PathBuf::from("/site"), PathBuf::from("/private")]);
        let path = LibrarySearchPath::with_private(Path::new("/private"), &rest);
        assert_eq!(
            path.entries(),
            &[PathBuf::from("/private"), PathBuf::from("/site")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn renders_platform_separator() {
        let path = LibrarySearchPath::new([PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(path.to_env_value().unwrap(), OsString::from("/a:/b"));
    }

    #[cfg(unix)]
    #[test]
    fn applies_to_child_without_touching_own_environment() {
        let before = env::var_os(SEARCH_PATH_VAR);
        let path = LibrarySearchPath::new([PathBuf::from("/revcheck/private")]);
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf '%s' \"$R_LIBS\""]);
        path.apply(&mut cmd).unwrap();
        let output = cmd.output().unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "/revcheck/private");
        assert_eq!(env::var_os(SEARCH_PATH_VAR), before);
    }
}
