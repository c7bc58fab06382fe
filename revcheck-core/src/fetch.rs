// revcheck-core/src/fetch.rs
use std::path::PathBuf;
use std::sync::Arc;

use revcheck_common::error::{Result, RevcheckError};
use revcheck_common::model::MetadataSnapshot;
use tracing::{debug, instrument};

use crate::download::{fetch_cached, Downloader};

/// Where a package's source archive came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFetch {
    Cached(PathBuf),
    Downloaded(PathBuf),
    /// The package is not in the source snapshot.
    NoSource,
}

/// Per-run store of source archives, shared by all check workers.
///
/// Concurrent callers only ever ask for distinct names, and downloads land
/// under a temporary name before being renamed into place, so no locking is
/// needed.
pub struct SourceCache {
    cache_dir: PathBuf,
    downloader: Arc<dyn Downloader>,
}

impl SourceCache {
    pub fn new(cache_dir: impl Into<PathBuf>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            downloader,
        }
    }

    #[instrument(skip(self, snapshot))]
    pub fn fetch_source(&self, name: &str, snapshot: &MetadataSnapshot) -> Result<SourceFetch> {
        let Some(record) = snapshot.get(name) else {
            debug!("No source record for {}", name);
            return Ok(SourceFetch::NoSource);
        };
        let (path, downloaded) =
            fetch_cached(&record.source_url, &self.cache_dir, self.downloader.as_ref())
                .map_err(|e| RevcheckError::FetchSource(name.to_string(), e.to_string()))?;
        Ok(if downloaded {
            SourceFetch::Downloaded(path)
        } else {
            SourceFetch::Cached(path)
        })
    }
}

#[cfg(test)]
mod tests {
    use revcheck_common::model::PackageForm;

    use super::*;
    use crate::download::testing::FakeDownloader;

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot::from_index(
            "https://repo.example",
            &PackageForm::Source,
            "Package: A\nVersion: 1.0\n\nPackage: Broken\nVersion: 2.0\n",
        )
        .unwrap()
    }

    #[test]
    fn downloads_once_then_serves_cache() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Arc::new(FakeDownloader::with(&[(
            "https://repo.example/src/contrib/A_1.0.tar.gz",
            b"archive",
        )]));
        let cache = SourceCache::new(dir.path(), downloader.clone());
        let snapshot = snapshot();

        let first = cache.fetch_source("A", &snapshot).unwrap();
        let second = cache.fetch_source("A", &snapshot).unwrap();
        let expected = dir.path().join("A_1.0.tar.gz");
        assert_eq!(first, SourceFetch::Downloaded(expected.clone()));
        assert_eq!(second, SourceFetch::Cached(expected));
        assert_eq!(downloader.calls(), 1);
    }

    #[test]
    fn unknown_name_has_no_source() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Arc::new(FakeDownloader::default());
        let cache = SourceCache::new(dir.path(), downloader.clone());
        assert_eq!(cache.fetch_source("Z", &snapshot()).unwrap(), SourceFetch::NoSource);
        assert_eq!(downloader.calls(), 0);
    }

    #[test]
    fn download_failure_names_package() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(dir.path(), Arc::new(FakeDownloader::default()));
        let err = cache.fetch_source("Broken", &snapshot()).unwrap_err();
        assert!(matches!(err, RevcheckError::FetchSource(ref name, _) if name == "Broken"));
    }
}
