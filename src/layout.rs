//! On-disk layout for materialized content.
//!
//! ```text
//! <output_root>/
//! └── <UPPERCASE(ID)>/
//!     ├── image<ext>
//!     ├── thumb<ext>
//!     ├── <metadata file>
//!     ├── .actor/<ActorName><ext>
//!     ├── .sample/sample@<Index><ext>
//!     └── .thumb/thumb@<Index><ext>
//! ```

use std::path::{Path, PathBuf};

use crate::domain::Content;
use crate::reference::with_extension_of;

pub const ACTOR_DIR: &str = ".actor";
pub const SAMPLE_DIR: &str = ".sample";
pub const SAMPLE_THUMB_DIR: &str = ".thumb";

/// A reference paired with the file it materializes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTarget {
    pub reference: String,
    pub path: PathBuf,
}

/// Path calculator for a single content record
#[derive(Debug, Clone)]
pub struct ItemLayout {
    dir: PathBuf,
}

impl ItemLayout {
    pub fn new(output_root: &Path, content: &Content) -> Self {
        Self {
            dir: output_root.join(content.dir_key()),
        }
    }

    /// Per-item directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cover image stem (no extension)
    pub fn image(&self) -> PathBuf {
        self.dir.join("image")
    }

    pub fn thumb(&self) -> PathBuf {
        self.dir.join("thumb")
    }

    /// Actor image stem. Path separators in the name are replaced so the
    /// file always lands directly under `.actor/`.
    pub fn actor(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(ACTOR_DIR).join(safe)
    }

    pub fn sample_image(&self, index: i64) -> PathBuf {
        self.dir.join(SAMPLE_DIR).join(format!("sample@{}", index))
    }

    pub fn sample_thumb(&self, index: i64) -> PathBuf {
        self.dir.join(SAMPLE_THUMB_DIR).join(format!("thumb@{}", index))
    }

    /// Metadata file path
    pub fn metadata(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Every materialization target for the record, in enumeration order.
    /// Empty references are skipped.
    pub fn targets(&self, content: &Content, include_samples: bool) -> Vec<MediaTarget> {
        let mut stems: Vec<(&str, PathBuf)> = vec![
            (content.image.as_str(), self.image()),
            (content.thumb.as_str(), self.thumb()),
        ];

        for actor in &content.actors {
            stems.push((actor.image.as_str(), self.actor(&actor.name)));
        }

        if include_samples {
            for sample in &content.sample {
                stems.push((sample.image.as_str(), self.sample_image(sample.index)));
                stems.push((sample.thumb.as_str(), self.sample_thumb(sample.index)));
            }
        }

        stems
            .into_iter()
            .filter(|(reference, _)| !reference.is_empty())
            .map(|(reference, stem)| MediaTarget {
                reference: reference.to_string(),
                path: with_extension_of(&stem, reference),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sample;

    fn scenario() -> Content {
        Content::new("abc123")
            .with_image("http://x/a.jpg?sig=1")
            .with_thumb("http://x/b.png")
            .with_actor("Jane", "http://x/j.jpg")
            .with_sample(Sample::new(0, "http://x/s0.jpg", "http://x/t0.jpg"))
    }

    #[test]
    fn test_targets_match_layout() {
        let content = scenario();
        let layout = ItemLayout::new(Path::new("/out"), &content);
        let paths: Vec<PathBuf> = layout
            .targets(&content, true)
            .into_iter()
            .map(|t| t.path)
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/out/ABC123/image.jpg"),
                PathBuf::from("/out/ABC123/thumb.png"),
                PathBuf::from("/out/ABC123/.actor/Jane.jpg"),
                PathBuf::from("/out/ABC123/.sample/sample@0.jpg"),
                PathBuf::from("/out/ABC123/.thumb/thumb@0.jpg"),
            ]
        );
    }

    #[test]
    fn test_targets_skip_samples_and_empty() {
        let content = scenario().with_actor("Nobody", "");
        let layout = ItemLayout::new(Path::new("/out"), &content);
        let targets = layout.targets(&content, false);

        assert_eq!(targets.len(), 3);
        assert!(targets
            .iter()
            .all(|t| !t.path.to_string_lossy().contains(SAMPLE_DIR)));
    }

    #[test]
    fn test_actor_name_separators_replaced() {
        let content = Content::new("id");
        let layout = ItemLayout::new(Path::new("/out"), &content);

        assert_eq!(
            layout.actor("AC/DC"),
            PathBuf::from("/out/ID/.actor/AC_DC")
        );
    }

    #[test]
    fn test_metadata_path() {
        let content = Content::new("id");
        let layout = ItemLayout::new(Path::new("/out"), &content);
        assert_eq!(layout.metadata("info.json"), PathBuf::from("/out/ID/info.json"));
    }
}
