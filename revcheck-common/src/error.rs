use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RevcheckError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Metadata Fetch Error: no package index could be obtained ({0})")]
    MetadataFetch(String),

    #[error("Unsatisfiable dependency '{0}': no artifact for this platform")]
    UnsatisfiableDependency(String),

    #[error("Failed to install '{0}': {1}")]
    InstallFailure(String, String),

    #[error("Failed to fetch source for '{0}': {1}")]
    FetchSource(String, String),

    #[error("Check invocation failed for '{0}': {1}")]
    CheckInvocation(String, String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    Download(String, String, String),

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Parsing Error in {0}: {1}")]
    Parse(&'static str, String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Failed to execute command: {0}")]
    CommandExec(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for RevcheckError {
    fn from(err: std::io::Error) -> Self {
        RevcheckError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for RevcheckError {
    fn from(err: reqwest::Error) -> Self {
        RevcheckError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for RevcheckError {
    fn from(err: serde_json::Error) -> Self {
        RevcheckError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RevcheckError>;
