//! Small filesystem helpers shared by the cache and the writers.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Whether `path` is a regular file with a non-zero size.
///
/// A missing file or a directory is `Ok(false)`; any other stat failure is
/// returned.
pub async fn is_non_empty_file(path: &Path) -> std::io::Result<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Sibling temp path (`<path>.part`) used while a file is being written
pub fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(Into::into).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Remove a leftover temp file, ignoring "not found"
pub async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
    }
}
