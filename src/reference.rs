//! Reference normalization.
//!
//! Remote references are usually URLs that carry signed-access or
//! cache-busting query strings. Those must never leak into file names.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Strip a trailing `?query` suffix
pub fn trim_query(reference: &str) -> &str {
    match reference.find('?') {
        Some(pos) => &reference[..pos],
        None => reference,
    }
}

/// Extension of the reference's final segment, including the leading `.`.
///
/// Returns an empty string when there is none.
pub fn extension(reference: &str) -> String {
    let trimmed = trim_query(reference);
    let segment = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);

    match segment.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < segment.len() => segment[pos..].to_string(),
        _ => String::new(),
    }
}

/// Append the reference's extension to a target stem.
///
/// Any `?...` suffix on the stem's final component is dropped first.
pub fn with_extension_of(stem: &Path, reference: &str) -> PathBuf {
    let mut name: OsString = stem
        .file_name()
        .map(|n| trim_query(&n.to_string_lossy()).into())
        .unwrap_or_default();
    name.push(extension(reference));

    match stem.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
