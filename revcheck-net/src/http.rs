use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use revcheck_common::error::{Result, RevcheckError};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::validation::{validate_url, UrlKind};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = concat!("revcheck/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| RevcheckError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// Fetches a text document such as a `PACKAGES` index.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    match validate_url(url)? {
        UrlKind::Local(path) => {
            debug!("Reading local index {}", path.display());
            tokio::fs::read_to_string(&path).await.map_err(|e| {
                RevcheckError::IoError(format!("Failed to read {}: {e}", path.display()))
            })
        }
        UrlKind::Remote(_) => {
            let response = client.get(url).send().await.map_err(|e| {
                debug!("HTTP request failed for {url}: {e}");
                RevcheckError::HttpError(format!("HTTP request failed for {url}: {e}"))
            })?;
            let status = response.status();
            debug!("Received HTTP status: {} for {}", status, url);
            if !status.is_success() {
                return Err(RevcheckError::HttpError(format!(
                    "HTTP error {status} for URL {url}"
                )));
            }
            response
                .text()
                .await
                .map_err(|e| RevcheckError::HttpError(format!("Failed to read body of {url}: {e}")))
        }
    }
}

/// Writes the body chunk by chunk; archives are never held in memory whole.
async fn stream_to_file(response: Response, temp_path: &Path) -> Result<()> {
    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        RevcheckError::IoError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            RevcheckError::HttpError(format!("Failed to read response body: {e}"))
        })?;
        temp_file.write_all(&chunk).await.map_err(|e| {
            RevcheckError::IoError(format!(
                "Failed to write download stream to {}: {}",
                temp_path.display(),
                e
            ))
        })?;
    }
    temp_file.flush().await?;
    Ok(())
}

/// Downloads `url` to `final_path`, writing to a temporary sibling first so
/// that a partially written file is never visible under the final name.
pub async fn download_file(client: &Client, url: &str, final_path: &Path) -> Result<PathBuf> {
    let file_label = final_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_filename = format!(".{file_label}.download");
    let temp_path = final_path.with_file_name(temp_filename);
    debug!("Downloading {} to temporary path {}", url, temp_path.display());
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let written = match validate_url(url)? {
        UrlKind::Local(path) => tokio::fs::copy(&path, &temp_path)
            .await
            .map(|_| ())
            .map_err(|e| RevcheckError::Download(file_label.clone(), url.to_string(), e.to_string())),
        UrlKind::Remote(_) => {
            let response = client.get(url).send().await.map_err(|e| {
                RevcheckError::HttpError(format!("HTTP request failed for {url}: {e}"))
            })?;
            let status = response.status();
            if !status.is_success() {
                error!("HTTP error {} for URL {}", status, url);
                let reason = match status {
                    StatusCode::NOT_FOUND => "Resource not found (404)".to_string(),
                    StatusCode::FORBIDDEN => "Access forbidden (403)".to_string(),
                    other => format!("HTTP error {other}"),
                };
                return Err(RevcheckError::Download(file_label, url.to_string(), reason));
            }
            stream_to_file(response, &temp_path).await
        }
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, final_path).map_err(|e| {
        RevcheckError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            final_path.display(),
            e
        ))
    })?;
    debug!("Moved download to final location: {}", final_path.display());
    Ok(final_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_url(path: &Path) -> String {
        url::Url::from_file_path(path).unwrap().to_string()
    }

    #[tokio::test]
    async fn fetches_local_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("PACKAGES");
        fs::write(&index, "Package: A\nVersion: 1.0\n").unwrap();
        let client = build_http_client().unwrap();
        let text = fetch_text(&client, &file_url(&index)).await.unwrap();
        assert!(text.contains("Package: A"));
    }

    #[tokio::test]
    async fn downloads_local_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("A_1.0.tar.gz");
        fs::write(&source, b"archive").unwrap();
        let dest_dir = dir.path().join("cache");
        fs::create_dir(&dest_dir).unwrap();
        let dest = dest_dir.join("A_1.0.tar.gz");

        let client = build_http_client().unwrap();
        let path = download_file(&client, &file_url(&source), &dest).await.unwrap();
        assert_eq!(path, dest);
        assert_eq!(fs::read(&dest).unwrap(), b"archive");
        assert!(!dest_dir.join(".A_1.0.tar.gz.download").exists());
    }

    #[tokio::test]
    async fn missing_local_file_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = build_http_client().unwrap();
        let err = download_file(
            &client,
            &file_url(&dir.path().join("nope.tar.gz")),
            &dir.path().join("out.tar.gz"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RevcheckError::Download(..)));
    }

    #[tokio::test]
    async fn streams_remote_archive_to_disk() {
        let mut server = mockito::Server::new_async().await;
        let body: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        let _m = server
            .mock("GET", "/src/contrib/A_1.0.tar.gz")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("A_1.0.tar.gz");
        let client = build_http_client().unwrap();
        let url = format!("{}/src/contrib/A_1.0.tar.gz", server.url());
        download_file(&client, &url, &dest).await.unwrap();
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert!(!dir.path().join(".A_1.0.tar.gz.download").exists());
    }

    #[tokio::test]
    async fn not_found_leaves_nothing_behind() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/src/contrib/Gone_1.0.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Gone_1.0.tar.gz");
        let client = build_http_client().unwrap();
        let url = format!("{}/src/contrib/Gone_1.0.tar.gz", server.url());
        let err = download_file(&client, &url, &dest).await.unwrap_err();
        assert!(matches!(err, RevcheckError::Download(_, _, ref reason) if reason.contains("404")));
        assert!(!dest.exists());
        assert!(!dir.path().join(".Gone_1.0.tar.gz.download").exists());
    }
}
