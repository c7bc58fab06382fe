// revcheck-net/src/validation.rs
use std::path::PathBuf;

use revcheck_common::error::{Result, RevcheckError};
use tracing::warn;
use url::Url;

/// Where a validated URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    Remote(Url),
    /// `file://` URL of a local mirror.
    Local(PathBuf),
}

/// Accepts `https`, `http` (with a warning) and `file` URLs.
pub fn validate_url(url_str: &str) -> Result<UrlKind> {
    let url = Url::parse(url_str)
        .map_err(|e| RevcheckError::Validation(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" => Ok(UrlKind::Remote(url)),
        "http" => {
            warn!("Using unencrypted URL {}", url_str);
            Ok(UrlKind::Remote(url))
        }
        "file" => url.to_file_path().map(UrlKind::Local).map_err(|_| {
            RevcheckError::Validation(format!("'{url_str}' is not a valid local file URL"))
        }),
        other => Err(RevcheckError::Validation(format!(
            "Invalid URL scheme for '{url_str}': must be https, http or file, but got '{other}'"
        ))),
    }
}
