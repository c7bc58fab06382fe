// revcheck-core/src/metadata.rs
use std::future::Future;

use futures::future::join_all;
use reqwest::Client;
use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::model::{MetadataSnapshot, PackageForm};
use tracing::{debug, info, instrument, warn};

/// Retrieves the raw text of a repository index.
pub trait IndexFetcher {
    fn fetch_index(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

pub struct HttpIndexFetcher {
    client: Client,
}

impl HttpIndexFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl IndexFetcher for HttpIndexFetcher {
    fn fetch_index(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
        let client = self.client.clone();
        let url = url.to_string();
        async move { revcheck_net::fetch_text(&client, &url).await }
    }
}

/// Builds a snapshot from every repository in `sources`.
///
/// Indexes are fetched concurrently and merged in the order given, so on a
/// name collision the earlier repository wins. Unreachable repositories are
/// skipped with a warning, as are unparsable indexes; it is an error only
/// if none could be read.
#[instrument(skip_all, fields(form = %form, sources = sources.len()))]
pub async fn fetch_snapshot<F>(
    sources: &[String],
    form: &PackageForm,
    fetcher: &F,
) -> Result<MetadataSnapshot>
where
    F: IndexFetcher + Sync,
{
    if sources.is_empty() {
        return Err(RevcheckError::MetadataFetch(
            "no repositories configured".to_string(),
        ));
    }

    let fetches = sources.iter().map(|repository| {
        let url = form.index_url(repository);
        async move {
            debug!("Fetching index {}", url);
            let result = fetcher.fetch_index(&url).await;
            (repository, url, result)
        }
    });
    let results = join_all(fetches).await;

    let mut snapshot = MetadataSnapshot::new();
    let mut failures = Vec::new();
    let mut reachable = 0usize;
    for (repository, url, result) in results {
        match result {
            Ok(text) => match MetadataSnapshot::from_index(repository, form, &text) {
                Ok(parsed) => {
                    reachable += 1;
                    snapshot.merge(parsed);
                }
                Err(e) => {
                    warn!("Could not read package index {}: {}", url, e);
                    failures.push(format!("{url}: {e}"));
                }
            },
            Err(e) => {
                warn!("Could not fetch package index {}: {}", url, e);
                failures.push(format!("{url}: {e}"));
            }
        }
    }

    if reachable == 0 {
        return Err(RevcheckError::MetadataFetch(failures.join("; ")));
    }
    info!(
        "{} snapshot holds {} packages from {}/{} repositories",
        form,
        snapshot.len(),
        reachable,
        sources.len()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapFetcher(HashMap<String, String>);

    impl IndexFetcher for MapFetcher {
        fn fetch_index(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
            let result = self
                .0
                .get(url)
                .cloned()
                .ok_or_else(|| RevcheckError::HttpError(format!("unreachable: {url}")));
            async move { result }
        }
    }

    fn fetcher(entries: &[(&str, &str)]) -> MapFetcher {
        MapFetcher(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn sources(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn first_source_wins_on_collision() {
        let fetcher = fetcher(&[
            ("https://one.example/src/contrib/PACKAGES", "Package: A\nVersion: 1.0\n"),
            (
                "https://two.example/src/contrib/PACKAGES",
                "Package: A\nVersion: 2.0\n\nPackage: B\nVersion: 1.0\n",
            ),
        ]);
        let snapshot = fetch_snapshot(
            &sources(&["https://one.example", "https://two.example"]),
            &PackageForm::Source,
            &fetcher,
        )
        .await
        .unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("A").unwrap().version.as_str(), "1.0");
    }

    #[tokio::test]
    async fn partial_failure_degrades() {
        let fetcher = fetcher(&[(
            "https://two.example/src/contrib/PACKAGES",
            "Package: B\nVersion: 1.0\n",
        )]);
        let snapshot = fetch_snapshot(
            &sources(&["https://one.example", "https://two.example"]),
            &PackageForm::Source,
            &fetcher,
        )
        .await
        .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("B"));
    }

    #[tokio::test]
    async fn total_failure_is_fatal() {
        let err = fetch_snapshot(
            &sources(&["https://one.example"]),
            &PackageForm::Source,
            &fetcher(&[]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RevcheckError::MetadataFetch(_)));
    }

    #[tokio::test]
    async fn binary_form_queries_platform_index() {
        let fetcher = fetcher(&[(
            "https://one.example/bin/macosx/big-sur-arm64/contrib/4.4/PACKAGES",
            "Package: A\nVersion: 1.0\n",
        )]);
        let form = PackageForm::Binary {
            platform: "macosx/big-sur-arm64".to_string(),
            tool_version: "4.4".to_string(),
        };
        let snapshot = fetch_snapshot(&sources(&["https://one.example"]), &form, &fetcher)
            .await
            .unwrap();
        assert_eq!(
            snapshot.get("A").unwrap().binary_url.as_deref(),
            Some("https://one.example/bin/macosx/big-sur-arm64/contrib/4.4/A_1.0.tgz")
        );
    }
}
