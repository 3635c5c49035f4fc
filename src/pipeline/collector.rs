//! Reference collector.
//!
//! A producer task walks the content record and sends each non-empty
//! reference over an unbounded channel. The consumer loop drains it and asks
//! the cache to populate every reference, running up to
//! `populate_concurrency` requests at once.
//!
//! Individual population failures never fail the pass. They are logged and
//! returned in `CollectReport::failures`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::cache::{Cache, CacheError, CacheHandle};
use crate::config::PipelineOptions;
use crate::domain::Content;

/// Errors that stop a collection pass
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Reference collection cancelled")]
    Cancelled,
}

/// A reference that could not be populated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateFailure {
    pub reference: String,
    pub error: String,
}

/// Outcome of a collection pass
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    /// Newly populated entries
    pub populated: Vec<CacheHandle>,

    /// References that were already cached (including repeats within the record)
    pub already_cached: Vec<String>,

    /// References that failed to populate, in completion order
    pub failures: Vec<PopulateFailure>,
}

impl CollectReport {
    /// Total references seen
    pub fn total(&self) -> usize {
        self.populated.len() + self.already_cached.len() + self.failures.len()
    }

    /// Whether every reference is now cached
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Populate the cache for every reference on `content`.
///
/// Samples are included only when `options.sample` is set.
#[instrument(skip_all, fields(id = %content.id))]
pub async fn collect(
    cache: Arc<dyn Cache>,
    content: &Content,
    options: &PipelineOptions,
    cancel: &CancellationToken,
) -> Result<CollectReport, CollectError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let references: Vec<String> = content
        .references(options.sample)
        .map(str::to_owned)
        .collect();
    let producer_cancel = cancel.clone();
    let producer = tokio::spawn(async move {
        for reference in references {
            if producer_cancel.is_cancelled() || tx.send(reference).is_err() {
                break;
            }
        }
    });

    let semaphore = Arc::new(Semaphore::new(options.populate_concurrency.max(1)));
    let mut tasks: JoinSet<(String, Result<CacheHandle, CacheError>)> = JoinSet::new();
    let mut in_flight: HashMap<task::Id, String> = HashMap::new();
    let mut seen = HashSet::new();
    let mut report = CollectReport::default();

    loop {
        let reference = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                producer.abort();
                tasks.abort_all();
                return Err(CollectError::Cancelled);
            }
            next = rx.recv() => match next {
                Some(reference) => reference,
                None => break,
            },
        };

        if !seen.insert(reference.clone()) {
            report.already_cached.push(reference);
            continue;
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                producer.abort();
                tasks.abort_all();
                return Err(CollectError::Cancelled);
            }
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        if options.debug {
            info!(reference = %reference, "Populating");
        }

        let cache = Arc::clone(&cache);
        let task_reference = reference.clone();
        let handle = tasks.spawn(async move {
            let _permit = permit;
            let outcome = cache.populate(&task_reference).await;
            (task_reference, outcome)
        });
        in_flight.insert(handle.id(), reference);
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tasks.abort_all();
                return Err(CollectError::Cancelled);
            }
            joined = tasks.join_next_with_id() => match joined {
                Some(joined) => joined,
                None => break,
            },
        };

        match joined {
            Ok((id, (_, Ok(handle)))) => {
                in_flight.remove(&id);
                report.populated.push(handle)
            }
            Ok((id, (reference, Err(e)))) if e.is_already_exists() => {
                in_flight.remove(&id);
                report.already_cached.push(reference)
            }
            Ok((id, (reference, Err(e)))) => {
                in_flight.remove(&id);
                error!(reference = %reference, error = %e, "Failed to populate cache");
                report.failures.push(PopulateFailure {
                    reference,
                    error: e.to_string(),
                });
            }
            Err(e) => {
                let reference = in_flight.remove(&e.id()).unwrap_or_default();
                error!(reference = %reference, error = %e, "Cache population task failed");
                report.failures.push(PopulateFailure {
                    reference,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
