//! Domain types for scraped content.

pub mod content;

pub use content::{Actor, Content, Sample};
