//! Fetch and materialization pipeline for one content record.
//!
//! ```text
//! Content ─→ collector (populates Cache) ─→ materializer (Cache → disk)
//!        └─→ metadata writer (→ disk)
//! ```
//!
//! Population failures are tolerated and reported. Materialization and
//! metadata failures are fatal to their own step only; files already written
//! stay in place so the next run can resume.

pub mod collector;
pub mod materializer;
pub mod metadata;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::cache::Cache;
use crate::config::PipelineOptions;
use crate::domain::Content;

pub use collector::{collect, CollectError, CollectReport, PopulateFailure};
pub use materializer::{materialize, materialize_excluding, MaterializeError, MaterializeReport};
pub use metadata::{write_metadata, MetadataError, MetadataOutcome};

/// Errors surfaced by a full pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Materialization failed: {0}")]
    Materialize(#[source] MaterializeError),

    #[error("Metadata write failed: {0}")]
    Metadata(#[from] MetadataError),
}

impl From<CollectError> for PipelineError {
    fn from(e: CollectError) -> Self {
        match e {
            CollectError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<MaterializeError> for PipelineError {
    fn from(e: MaterializeError) -> Self {
        match e {
            MaterializeError::Cancelled => Self::Cancelled,
            other => Self::Materialize(other),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub collect: CollectReport,
    pub media: MaterializeReport,
    pub metadata: MetadataOutcome,
}

/// Runs the collector, materializer and metadata writer for content records
pub struct Pipeline {
    cache: Arc<dyn Cache>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline over a cache
    pub fn new(cache: Arc<dyn Cache>, options: PipelineOptions) -> Self {
        Self { cache, options }
    }

    /// Get the options
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process one record.
    ///
    /// References that failed to populate are left out of materialization.
    /// The metadata step runs even when materialization fails; the first
    /// failure (media before metadata) is the one returned.
    #[instrument(skip_all, fields(id = %content.id))]
    pub async fn run(
        &self,
        content: &Content,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let collected = collect(Arc::clone(&self.cache), content, &self.options, cancel).await?;
        if !collected.is_complete() {
            warn!(
                failed = collected.failures.len(),
                total = collected.total(),
                "Some references could not be cached"
            );
        }

        let unavailable: HashSet<String> = collected
            .failures
            .iter()
            .map(|f| f.reference.clone())
            .collect();
        let media = materialize_excluding(
            self.cache.as_ref(),
            content,
            &self.options,
            &unavailable,
            cancel,
        )
        .await;
        if matches!(media, Err(MaterializeError::Cancelled)) {
            return Err(PipelineError::Cancelled);
        }

        let metadata = write_metadata(
            content,
            &self.options.output_root,
            &self.options.metadata_file,
        )
        .await;

        let media = media?;
        let metadata = metadata?;

        info!(
            written = media.written.len(),
            skipped = media.skipped.len(),
            metadata_written = metadata.is_written(),
            "Content materialized"
        );

        Ok(PipelineReport {
            collect: collected,
            media,
            metadata,
        })
    }
}
