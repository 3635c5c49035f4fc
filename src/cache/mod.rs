//! Cache client interface.
//!
//! The pipeline only needs two things from a cache: make sure a reference is
//! present, and give back a byte stream for it. `DiskCache` is the bundled
//! implementation; anything else can plug in through the `Cache` trait.

pub mod disk;
pub mod fetch;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

pub use disk::DiskCache;
pub use fetch::{FetchError, Fetcher, HttpFetcher};

/// Readable stream over a cached resource's bytes
pub type CacheReader = Box<dyn AsyncRead + Send + Unpin>;

/// Errors returned by a cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The reference was populated earlier. Not a hard failure.
    #[error("Already cached: {0}")]
    AlreadyExists(String),

    #[error("Not cached: {0}")]
    NotCached(String),

    #[error("Fetch failed for {reference}: {source}")]
    Fetch {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Whether this error only reports an earlier population
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// A populated cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    /// Cache key (hex SHA256 of the reference)
    pub key: String,

    /// Where the entry lives
    pub path: PathBuf,

    /// Stored size in bytes
    pub size: u64,
}

/// Trait for content caches
#[async_trait]
pub trait Cache: Send + Sync {
    /// Ensure the resource behind `reference` is cached.
    ///
    /// Returns `CacheError::AlreadyExists` if it was populated earlier.
    async fn populate(&self, reference: &str) -> Result<CacheHandle, CacheError>;

    /// Open the cached bytes for `reference`
    async fn open_reader(&self, reference: &str) -> Result<CacheReader, CacheError>;
}
