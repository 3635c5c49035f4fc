//! scrapekeep - Fetch, cache and materialize media for scraped content
//!
//! Takes a normalized content record (cover image, thumbnail, actors with
//! portraits, preview samples), fills a content cache with every referenced
//! resource, then copies the cached bytes into a deterministic directory tree
//! next to a JSON snapshot of the record.
//!
//! # Architecture
//!
//! - Reference collection is a producer task feeding an unbounded channel,
//!   drained by a consumer that populates the cache concurrently
//! - Materialization and metadata writes are idempotent: a non-empty file at
//!   the target path is never touched again
//! - Files become visible only after their bytes are fully written
//!
//! # Modules
//!
//! - `domain`: Content records
//! - `reference`: Query stripping and extension derivation
//! - `layout`: Target paths for one record
//! - `cache`: Cache trait, on-disk cache, HTTP fetcher
//! - `pipeline`: Collector, materializer, metadata writer
//! - `config`: YAML configuration
//! - `logging`: Tracing setup
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scrapekeep::{DiskCache, HttpFetcher, Pipeline, ResolvedConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ResolvedConfig::discover(&std::env::current_dir()?)?;
//! let cache = Arc::new(DiskCache::new(&config.cache_dir, HttpFetcher::new()));
//! let pipeline = Pipeline::new(cache, config.options.clone());
//! let report = pipeline.run(&content, &CancellationToken::new()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub(crate) mod fsutil;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod reference;

// Re-export main types at crate root for convenience
pub use cache::{Cache, CacheError, CacheHandle, CacheReader, DiskCache, FetchError, Fetcher, HttpFetcher};
pub use config::{PipelineOptions, ResolvedConfig};
pub use domain::{Actor, Content, Sample};
pub use layout::ItemLayout;
pub use pipeline::{
    collect, materialize, materialize_excluding, write_metadata, CollectError, CollectReport,
    MaterializeError, MaterializeReport, MetadataError, MetadataOutcome, Pipeline, PipelineError,
    PipelineReport, PopulateFailure,
};
