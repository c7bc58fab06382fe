// revcheck-core/src/download.rs
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Client;
use revcheck_common::error::{Result, RevcheckError};
use tokio::runtime::Handle;
use tracing::debug;

/// Fetches a URL into a file. Called from worker threads, so it is
/// blocking.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<PathBuf>;
}

/// Downloads over HTTP by driving the async client on a runtime owned by
/// the caller. Must not be used from within an async task.
pub struct HttpDownloader {
    client: Client,
    handle: Handle,
}

impl HttpDownloader {
    pub fn new(client: Client, handle: Handle) -> Self {
        Self { client, handle }
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        self.handle
            .block_on(revcheck_net::download_file(&self.client, url, dest))
    }
}

/// Last path segment of `url`, ignoring any query or fragment.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Returns the cached copy of `url` in `dir`, downloading it first if
/// needed. The flag is `true` when a download happened.
pub fn fetch_cached(url: &str, dir: &Path, downloader: &dyn Downloader) -> Result<(PathBuf, bool)> {
    let file_name = file_name_from_url(url).ok_or_else(|| {
        RevcheckError::Download(String::new(), url.to_string(), "URL has no file name".to_string())
    })?;
    let path = dir.join(file_name);
    if path.is_file() {
        debug!("Using cached {}", path.display());
        return Ok((path, false));
    }
    fs::create_dir_all(dir).map_err(|e| {
        RevcheckError::IoError(format!("Failed to create cache directory {}: {e}", dir.display()))
    })?;
    let path = downloader.download(url, &path)?;
    Ok((path, true))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves canned bytes per URL and counts downloads.
    #[derive(Default)]
    pub struct FakeDownloader {
        pub files: HashMap<String, Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl FakeDownloader {
        pub fn with(files: &[(&str, &[u8])]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(url, bytes)| (url.to_string(), bytes.to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Downloader for FakeDownloader {
        fn download(&self, url: &str, dest: &Path) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bytes = self.files.get(url).ok_or_else(|| {
                RevcheckError::Download(
                    String::new(),
                    url.to_string(),
                    "Resource not found (404)".to_string(),
                )
            })?;
            fs::write(dest, bytes)?;
            Ok(dest.to_path_buf())
        }
    }
}
