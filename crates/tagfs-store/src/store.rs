//! Read-only view of the tag index consumed by the virtual filesystem.

use crate::error::StoreResult;
use crate::model::FileEntry;

/// Queries the virtual filesystem issues against the tag index.
///
/// Implementations serialize their own consistency; callers may invoke any
/// method concurrently from several threads and never hold locks across calls.
pub trait TagStore: Send + Sync {
    /// Every distinct tag name, in first-use order.
    fn list_tag_names(&self) -> StoreResult<Vec<String>>;

    /// Files carrying a tag called `name`, first tagged first.
    fn list_files_for_tag(&self, name: &str) -> StoreResult<Vec<FileEntry>>;

    /// First file tagged `tag` whose last path component is `base_name`.
    ///
    /// Two differently-pathed files with the same base name under one tag
    /// collide here; only the earliest one is returned.
    fn find_file_by_tag_and_base_name(
        &self,
        tag: &str,
        base_name: &str,
    ) -> StoreResult<Option<FileEntry>>;

    /// Whether at least one file carries a tag called `name`.
    fn tag_exists(&self, name: &str) -> StoreResult<bool>;
}
