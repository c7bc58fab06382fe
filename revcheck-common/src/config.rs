// revcheck-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{Result, RevcheckError};
use super::model::snapshot::PackageForm;

const DEFAULT_PRIMARY_REPOSITORY: &str = "https://cloud.r-project.org";
const DEFAULT_SECONDARY_REPOSITORY: &str = "https://bioconductor.org/packages/release/bioc";
const DEFAULT_PLATFORM: &str = "source";
const DEFAULT_TOOL_VERSION: &str = "4.4";
const DEFAULT_TOOL_COMMAND: &str = "R";
const LIBRARY_DIR_NAME: &str = "library";

#[derive(Debug, Clone)]
pub struct Config {
    pub primary_repository: String,
    pub secondary_repository: String,
    pub include_secondary_source: bool,
    pub dependency_library_path: PathBuf,
    /// Falls back to `dependency_library_path` when unset.
    pub source_cache_path: Option<PathBuf>,
    pub platform_type: String,
    pub tool_version: String,
    pub tool_command: String,
    pub concurrency: usize,
    /// Libraries the tool loads from besides the search path. Only read to
    /// see what is already installed. Discovered from the tool when unset.
    pub site_library_paths: Option<Vec<PathBuf>>,
    /// A fresh temporary directory is created when unset.
    pub results_directory: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading revcheck configuration from environment");
        Self::load_from(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dependency_library_path = match get("REVCHECK_LIB") {
            Some(path) => PathBuf::from(path),
            None => default_library_path()?,
        };

        let concurrency = match get("REVCHECK_NCPUS") {
            Some(raw) => parse_concurrency(&raw)?,
            None => 1,
        };

        let include_secondary_source = get("REVCHECK_INCLUDE_SECONDARY")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let config = Self {
            primary_repository: get("REVCHECK_REPO")
                .unwrap_or_else(|| DEFAULT_PRIMARY_REPOSITORY.to_string()),
            secondary_repository: get("REVCHECK_SECONDARY_REPO")
                .unwrap_or_else(|| DEFAULT_SECONDARY_REPOSITORY.to_string()),
            include_secondary_source,
            dependency_library_path,
            source_cache_path: get("REVCHECK_CACHE").map(PathBuf::from),
            platform_type: get("REVCHECK_PLATFORM").unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            tool_version: get("REVCHECK_TOOL_VERSION")
                .unwrap_or_else(|| DEFAULT_TOOL_VERSION.to_string()),
            tool_command: get("REVCHECK_TOOL").unwrap_or_else(|| DEFAULT_TOOL_COMMAND.to_string()),
            concurrency,
            site_library_paths: get("REVCHECK_SITE_LIBS")
                .map(|raw| env::split_paths(&raw).filter(|p| !p.as_os_str().is_empty()).collect()),
            results_directory: get("REVCHECK_RESULTS").map(PathBuf::from),
        };

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    pub fn library_dir(&self) -> &Path {
        &self.dependency_library_path
    }

    pub fn cache_dir(&self) -> &Path {
        self.source_cache_path
            .as_deref()
            .unwrap_or(&self.dependency_library_path)
    }

    /// Where install artifacts are cached. Binary archives can share file
    /// names with source tarballs, so they get their own directory.
    pub fn artifact_cache_dir(&self) -> PathBuf {
        match self.binary_form() {
            PackageForm::Source => self.cache_dir().to_path_buf(),
            PackageForm::Binary {
                platform,
                tool_version,
            } => self
                .cache_dir()
                .join("bin")
                .join(platform.replace('/', "-"))
                .join(tool_version),
        }
    }

    /// Repository URLs in the order they are consulted.
    pub fn repositories(&self) -> Vec<String> {
        let mut repos = vec![self.primary_repository.clone()];
        if self.include_secondary_source {
            repos.push(self.secondary_repository.clone());
        }
        repos
    }

    pub fn binary_form(&self) -> PackageForm {
        if self.platform_type == DEFAULT_PLATFORM {
            PackageForm::Source
        } else {
            PackageForm::Binary {
                platform: self.platform_type.clone(),
                tool_version: self.tool_version.clone(),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(RevcheckError::Config(
                "concurrency must be a positive integer".to_string(),
            ));
        }
        if self.tool_command.trim().is_empty() {
            return Err(RevcheckError::Config(
                "tool command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates the library and cache directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.library_dir(), self.cache_dir()] {
            if !dir.is_dir() {
                debug!("Creating directory {}", dir.display());
                fs::create_dir_all(dir).map_err(|e| {
                    RevcheckError::IoError(format!(
                        "Failed to create directory {}: {e}",
                        dir.display()
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Returns the configured results directory (creating it), or a freshly
    /// created temporary one that outlives the process.
    pub fn prepare_results_dir(&self) -> Result<PathBuf> {
        match &self.results_directory {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| {
                    RevcheckError::IoError(format!(
                        "Failed to create results directory {}: {e}",
                        dir.display()
                    ))
                })?;
                Ok(dir.clone())
            }
            None => {
                let temp = tempfile_dir()?;
                debug!("Using temporary results directory {}", temp.display());
                Ok(temp)
            }
        }
    }
}

fn default_library_path() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join("revcheck").join(LIBRARY_DIR_NAME))
        .ok_or_else(|| {
            RevcheckError::Config(
                "Could not determine a user cache directory; set REVCHECK_LIB".to_string(),
            )
        })
}

fn parse_concurrency(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(RevcheckError::Config(format!(
            "REVCHECK_NCPUS must be a positive integer, got '{raw}'"
        ))),
        Ok(n) => Ok(n),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn tempfile_dir() -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("revcheck-results-")
        .tempdir()
        .map_err(|e| RevcheckError::IoError(format!("Failed to create results directory: {e}")))?;
    Ok(dir.keep())
}
