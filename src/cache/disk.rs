//! Content-addressed on-disk cache.
//!
//! Entries live at `<dir>/<hh>/<sha256(reference)>`, where `hh` is the first
//! two hex characters of the key. No eviction is performed.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};

use super::{Cache, CacheError, CacheHandle, CacheReader, Fetcher};
use crate::fsutil::is_non_empty_file;

/// Cache key for a reference (full hex SHA256)
pub fn cache_key(reference: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference.as_bytes());
    hex::encode(hasher.finalize())
}

/// Disk cache filled through a `Fetcher`
pub struct DiskCache<F> {
    dir: PathBuf,
    fetcher: F,
}

impl<F: Fetcher> DiskCache<F> {
    pub fn new(dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    /// Cache root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the entry for `reference` is stored
    pub fn entry_path(&self, reference: &str) -> PathBuf {
        let key = cache_key(reference);
        self.dir.join(&key[..2]).join(key)
    }

    /// Check whether `reference` has a non-empty entry
    pub async fn contains(&self, reference: &str) -> Result<bool, CacheError> {
        Ok(is_non_empty_file(&self.entry_path(reference)).await?)
    }
}

/// Write `body` to a temp file beside `target`, sync it, then rename it in.
fn store_entry(target: &Path, body: &[u8]) -> std::io::Result<()> {
    let shard = target.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(shard)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl<F: Fetcher + 'static> Cache for DiskCache<F> {
    async fn populate(&self, reference: &str) -> Result<CacheHandle, CacheError> {
        let key = cache_key(reference);
        let path = self.dir.join(&key[..2]).join(&key);

        if is_non_empty_file(&path).await? {
            return Err(CacheError::AlreadyExists(reference.to_string()));
        }

        let body = self
            .fetcher
            .fetch(reference)
            .await
            .map_err(|source| CacheError::Fetch {
                reference: reference.to_string(),
                source,
            })?;

        if let Some(shard) = path.parent() {
            fs::create_dir_all(shard).await?;
        }

        let size = body.len() as u64;
        let target = path.clone();
        tokio::task::spawn_blocking(move || store_entry(&target, &body))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        tracing::debug!(reference, key = %key, size, "Cached");

        Ok(CacheHandle { key, path, size })
    }

    async fn open_reader(&self, reference: &str) -> Result<CacheReader, CacheError> {
        let path = self.entry_path(reference);
        match File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CacheError::NotCached(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct EchoFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for EchoFetcher {
        async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if reference.contains("missing") {
                return Err(FetchError::NotFound(reference.to_string()));
            }
            Ok(format!("body of {}", reference).into_bytes())
        }
    }

    fn create_test_cache() -> (DiskCache<EchoFetcher>, TempDir) {
        let temp = TempDir::new().unwrap();
        let cache = DiskCache::new(
            temp.path().join("cache"),
            EchoFetcher {
                calls: AtomicUsize::new(0),
            },
        );
        (cache, temp)
    }

    #[test]
    fn test_cache_key_is_stable_hex() {
        let k1 = cache_key("http://x/a.jpg");
        let k2 = cache_key("http://x/a.jpg");
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 64);
        assert!(k1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(k1, cache_key("http://x/b.jpg"));
    }

    #[tokio::test]
    async fn test_populate_then_read() {
        let (cache, _temp) = create_test_cache();

        let handle = cache.populate("http://x/a.jpg").await.unwrap();
        assert_eq!(handle.size, "body of http://x/a.jpg".len() as u64);
        assert!(handle.path.starts_with(cache.dir()));

        let mut reader = cache.open_reader("http://x/a.jpg").await.unwrap();
        let mut body = String::new();
        reader.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "body of http://x/a.jpg");
    }

    #[tokio::test]
    async fn test_populate_twice_reports_already_exists() {
        let (cache, _temp) = create_test_cache();

        cache.populate("http://x/a.jpg").await.unwrap();
        let err = cache.populate("http://x/a.jpg").await.unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(cache.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_no_entry() {
        let (cache, _temp) = create_test_cache();

        let err = cache.populate("http://x/missing.jpg").await.unwrap_err();
        assert!(matches!(err, CacheError::Fetch { .. }));
        assert!(!cache.contains("http://x/missing.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_reader_not_cached() {
        let (cache, _temp) = create_test_cache();

        let err = cache.open_reader("http://x/never.jpg").await.err().unwrap();
        assert!(matches!(err, CacheError::NotCached(_)));
    }
}
