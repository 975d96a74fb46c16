//! Records held by the tag index.

use std::path::Path;

use crate::error::{StoreError, StoreResult};

/// A real file on the host filesystem, identified by absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: i64,
    /// Literal host path. Symlinks in the virtual view resolve to exactly this.
    pub path: String,
}

impl FileEntry {
    /// Last path component, or `None` for paths like `/`.
    pub fn base_name(&self) -> Option<&str> {
        base_name(&self.path)
    }
}

/// A `name=value` label attached to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub file_id: i64,
    pub name: String,
    pub value: String,
}

/// Last component of a slash-separated path.
pub fn base_name(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|name| name.to_str())
}

/// Split a `name[=value]` argument on the first `=`.
///
/// Without `=` the whole string is the name and the value is empty.
/// Surrounding whitespace is trimmed from both halves.
pub fn parse_tag(s: &str) -> (String, String) {
    match s.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
        None => (s.trim().to_string(), String::new()),
    }
}

/// Reject names that could never appear as a directory under the mount.
pub fn validate_tag_name(name: &str) -> StoreResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(StoreError::InvalidTagName(name.to_string()));
    }
    Ok(())
}
