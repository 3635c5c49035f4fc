//! Scraped content records.
//!
//! A `Content` is produced upstream by a site scraper and handed to the
//! pipeline read-only. Field names on the wire follow the scraper's record
//! format (`ID`, `Image`, `Thumb`, `Actors`, `Sample`).

use serde::{Deserialize, Serialize};

/// One scraped item and the media it references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    /// Item identifier, upper-cased when used as a directory key
    #[serde(rename = "ID")]
    pub id: String,

    /// Cover image reference
    #[serde(default)]
    pub image: String,

    /// Thumbnail reference
    #[serde(default)]
    pub thumb: String,

    /// Cast, in scraper order
    #[serde(default)]
    pub actors: Vec<Actor>,

    /// Preview samples, in scraper order
    #[serde(default)]
    pub sample: Vec<Sample>,

    /// Any other scraped fields, carried into the metadata snapshot as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A cast member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Actor {
    /// Display name, also used as the image file stem
    #[serde(default)]
    pub name: String,

    /// Portrait reference
    #[serde(default)]
    pub image: String,
}

/// A preview sample (still image plus its thumbnail)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sample {
    /// Stable ordinal used in output file names
    #[serde(default)]
    pub index: i64,

    #[serde(default)]
    pub thumb: String,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub title: String,
}

impl Content {
    /// Create a record with just an ID
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the cover image
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the thumbnail
    pub fn with_thumb(mut self, thumb: impl Into<String>) -> Self {
        self.thumb = thumb.into();
        self
    }

    /// Add an actor
    pub fn with_actor(mut self, name: impl Into<String>, image: impl Into<String>) -> Self {
        self.actors.push(Actor {
            name: name.into(),
            image: image.into(),
        });
        self
    }

    /// Add a sample
    pub fn with_sample(mut self, sample: Sample) -> Self {
        self.sample.push(sample);
        self
    }

    /// Directory key for this record (upper-cased ID)
    pub fn dir_key(&self) -> String {
        self.id.to_uppercase()
    }

    /// Every non-empty reference, in enumeration order.
    ///
    /// Order: cover image, thumbnail, each actor image, then (only when
    /// `include_samples` is set) each sample's image followed by its thumb.
    pub fn references(&self, include_samples: bool) -> impl Iterator<Item = &str> + '_ {
        let head = [self.image.as_str(), self.thumb.as_str()];
        let actors = self.actors.iter().map(|a| a.image.as_str());
        let samples = self
            .sample
            .iter()
            .filter(move |_| include_samples)
            .flat_map(|s| [s.image.as_str(), s.thumb.as_str()]);

        head.into_iter()
            .chain(actors)
            .chain(samples)
            .filter(|r| !r.is_empty())
    }
}

impl Sample {
    /// Create a sample with image and thumbnail references
    pub fn new(index: i64, image: impl Into<String>, thumb: impl Into<String>) -> Self {
        Self {
            index,
            image: image.into(),
            thumb: thumb.into(),
            title: String::new(),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_content() -> Content {
        Content::new("abc123")
            .with_image("http://x/a.jpg?sig=1")
            .with_thumb("http://x/b.png")
            .with_actor("Jane", "http://x/j.jpg")
            .with_actor("NoPhoto", "")
            .with_sample(Sample::new(0, "http://x/s0.jpg", "http://x/t0.jpg"))
    }

    #[test]
    fn test_references_order_with_samples() {
        let content = sample_content();
        let refs: Vec<&str> = content.references(true).collect();

        assert_eq!(
            refs,
            vec![
                "http://x/a.jpg?sig=1",
                "http://x/b.png",
                "http://x/j.jpg",
                "http://x/s0.jpg",
                "http://x/t0.jpg",
            ]
        );
    }

    #[test]
    fn test_references_without_samples() {
        let content = sample_content();
        let refs: Vec<&str> = content.references(false).collect();

        assert_eq!(refs.len(), 3);
        assert!(!refs.iter().any(|r| r.contains("s0") || r.contains("t0")));
    }

    #[test]
    fn test_dir_key_is_uppercase() {
        assert_eq!(Content::new("abc-123").dir_key(), "ABC-123");
    }

    #[test]
    fn test_json_field_names() {
        let content = sample_content();
        let json = serde_json::to_value(&content).unwrap();

        assert_eq!(json["ID"], "abc123");
        assert_eq!(json["Image"], "http://x/a.jpg?sig=1");
        assert_eq!(json["Actors"][0]["Name"], "Jane");
        assert_eq!(json["Sample"][0]["Index"], 0);
    }

    #[test]
    fn test_extra_fields_pass_through() {
        let raw = r#"{"ID":"x1","Title":"Some Title","Release":"2020-01-01"}"#;
        let content: Content = serde_json::from_str(raw).unwrap();

        assert_eq!(content.id, "x1");
        assert!(content.image.is_empty());
        assert_eq!(content.extra["Title"], "Some Title");

        let back = serde_json::to_value(&content).unwrap();
        assert_eq!(back["Release"], "2020-01-01");
    }

    #[test]
    fn test_negative_sample_index_accepted() {
        let raw = r#"{"ID":"x2","Sample":[{"Index":-1,"Image":"http://x/s.jpg"}]}"#;
        let content: Content = serde_json::from_str(raw).unwrap();

        assert_eq!(content.sample[0].index, -1);
    }
}
