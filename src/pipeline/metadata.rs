//! Metadata writer.
//!
//! Persists a pretty-printed JSON snapshot of the content record beside its
//! media. A non-empty existing file is never overwritten; delete it to force a
//! refresh.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::Content;
use crate::fsutil::{discard, is_non_empty_file, part_path};
use crate::layout::ItemLayout;

/// Errors from the metadata writer
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to encode metadata: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a metadata write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// Snapshot written
    Written(PathBuf),

    /// A non-empty file was already there
    Skipped(PathBuf),
}

impl MetadataOutcome {
    /// Get the metadata path regardless of outcome
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Skipped(path) => path,
        }
    }

    /// Check if this call wrote the file
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// Write the snapshot of `content` to `<output_root>/<UPPERCASE(ID)>/<file_name>`
pub async fn write_metadata(
    content: &Content,
    output_root: &Path,
    file_name: &str,
) -> Result<MetadataOutcome, MetadataError> {
    let path = ItemLayout::new(output_root, content).metadata(file_name);
    let io_err = |source| MetadataError::Io {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    if is_non_empty_file(&path).await.map_err(io_err)? {
        return Ok(MetadataOutcome::Skipped(path));
    }

    let body = serde_json::to_vec_pretty(content)?;

    let part = part_path(&path);
    let written = async {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&part)
            .await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, &path).await
    }
    .await;

    if let Err(e) = written {
        discard(&part).await;
        return Err(io_err(e));
    }

    tracing::debug!(path = %path.display(), "Metadata written");
    Ok(MetadataOutcome::Written(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sample;
    use tempfile::TempDir;

    fn content() -> Content {
        Content::new("abc123")
            .with_image("http://x/a.jpg")
            .with_actor("Jane", "http://x/j.jpg")
            .with_sample(Sample::new(0, "http://x/s0.jpg", "http://x/t0.jpg").with_title("first"))
    }

    #[tokio::test]
    async fn test_write_then_skip() {
        let temp = TempDir::new().unwrap();

        let first = write_metadata(&content(), temp.path(), "info.json")
            .await
            .unwrap();
        assert!(first.is_written());
        assert_eq!(first.path(), temp.path().join("ABC123").join("info.json"));

        let changed = content().with_thumb("http://x/new.png");
        let second = write_metadata(&changed, temp.path(), "info.json")
            .await
            .unwrap();
        assert!(!second.is_written());

        let raw = fs::read_to_string(first.path()).await.unwrap();
        let stored: Content = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, content());
    }

    #[tokio::test]
    async fn test_output_is_pretty_json() {
        let temp = TempDir::new().unwrap();

        let outcome = write_metadata(&content(), temp.path(), "info.json")
            .await
            .unwrap();
        let raw = fs::read_to_string(outcome.path()).await.unwrap();

        assert!(raw.contains('\n'));
        assert!(raw.contains("\"ID\": \"abc123\""));
        assert!(raw.contains("\"Title\": \"first\""));
    }

    #[tokio::test]
    async fn test_empty_file_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ABC123").join("info.json");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, b"").await.unwrap();

        let outcome = write_metadata(&content(), temp.path(), "info.json")
            .await
            .unwrap();

        assert!(outcome.is_written());
        assert!(!fs::read(&path).await.unwrap().is_empty());
        assert!(!part_path(&path).exists());
    }

    #[tokio::test]
    async fn test_blocked_directory_is_io_error() {
        let temp = TempDir::new().unwrap();
        // A regular file where the item directory should be
        fs::write(temp.path().join("ABC123"), b"not a dir").await.unwrap();

        let err = write_metadata(&content(), temp.path(), "info.json")
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }
}
