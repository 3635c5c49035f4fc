//! Materializer: copies cached resources into the per-item directory tree.
//!
//! Every target is skipped when a non-empty file is already at its final
//! path, so repeated runs are cheap and interrupted runs can resume. Bytes are
//! written to `<final>.part`, synced, and only then renamed onto the final
//! path. The first failure aborts the whole call; files written before it are
//! left in place.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{Cache, CacheError};
use crate::config::PipelineOptions;
use crate::domain::Content;
use crate::fsutil::{discard, is_non_empty_file, part_path};
use crate::layout::{ItemLayout, MediaTarget};
use crate::reference::extension;

/// Errors that abort materialization of a record
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to read {reference} from cache: {source}")]
    Cache {
        reference: String,
        #[source]
        source: CacheError,
    },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Materialization cancelled")]
    Cancelled,
}

impl MaterializeError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of a materialization call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Files written by this call
    pub written: Vec<PathBuf>,

    /// Files left untouched because they already existed with content
    pub skipped: Vec<PathBuf>,

    /// Targets not attempted because their reference was excluded
    pub unavailable: Vec<PathBuf>,
}

/// Copy every cached resource of `content` under `options.output_root`.
pub async fn materialize(
    cache: &dyn Cache,
    content: &Content,
    options: &PipelineOptions,
    cancel: &CancellationToken,
) -> Result<MaterializeReport, MaterializeError> {
    materialize_excluding(cache, content, options, &HashSet::new(), cancel).await
}

/// Like `materialize`, but targets whose reference is in `exclude` are not
/// attempted (typically references that failed to populate).
#[instrument(skip_all, fields(id = %content.id))]
pub async fn materialize_excluding(
    cache: &dyn Cache,
    content: &Content,
    options: &PipelineOptions,
    exclude: &HashSet<String>,
    cancel: &CancellationToken,
) -> Result<MaterializeReport, MaterializeError> {
    let layout = ItemLayout::new(&options.output_root, content);
    let mut report = MaterializeReport::default();
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for target in layout.targets(content, options.sample) {
        if cancel.is_cancelled() {
            return Err(MaterializeError::Cancelled);
        }

        match claimed.get(&target.path) {
            Some(first) if first != &target.reference => warn!(
                path = %target.path.display(),
                kept = %first,
                dropped = %target.reference,
                "Two references share one target path; keeping the first"
            ),
            Some(_) => {}
            None => {
                claimed.insert(target.path.clone(), target.reference.clone());
            }
        }

        if exclude.contains(&target.reference) {
            report.unavailable.push(target.path);
            continue;
        }

        if copy_target(cache, &target, options.debug, cancel).await? {
            report.written.push(target.path);
        } else {
            report.skipped.push(target.path);
        }
    }

    debug!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        unavailable = report.unavailable.len(),
        "Materialized"
    );

    Ok(report)
}

/// Copy one target. Returns `false` when the file already existed.
async fn copy_target(
    cache: &dyn Cache,
    target: &MediaTarget,
    verbose: bool,
    cancel: &CancellationToken,
) -> Result<bool, MaterializeError> {
    let path = &target.path;
    let dir = path.parent().unwrap_or(Path::new("."));

    if verbose {
        info!(
            dir = %dir.display(),
            path = %path.display(),
            ext = %extension(&target.reference),
            "copy"
        );
    }

    if is_non_empty_file(path)
        .await
        .map_err(|e| MaterializeError::io(path, e))?
    {
        return Ok(false);
    }

    fs::create_dir_all(dir)
        .await
        .map_err(|e| MaterializeError::io(dir, e))?;

    let mut reader = cache
        .open_reader(&target.reference)
        .await
        .map_err(|source| MaterializeError::Cache {
            reference: target.reference.clone(),
            source,
        })?;

    let part = part_path(path);
    let copy = async {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&part)
            .await?;
        tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, path).await
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MaterializeError::Cancelled),
        copied = copy => copied.map_err(|e| MaterializeError::io(path, e)),
    };

    if result.is_err() {
        discard(&part).await;
    }
    result.map(|()| true)
}
