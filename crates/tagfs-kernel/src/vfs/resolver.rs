//! Path resolution against the tag index.
//!
//! A virtual path has at most two meaningful segments:
//!
//! | Segments | Node          | Exists when                                         |
//! |----------|---------------|-----------------------------------------------------|
//! | 0        | root          | always                                              |
//! | 1 `T`    | tag directory | some tag is named `T`                               |
//! | 2 `T/B`  | file link     | a file tagged `T` has base name `B` and is on disk   |
//! | 3+       | -             | never                                               |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tagfs_store::{StoreResult, TagStore};

use super::error::{VfsError, VfsResult};
use super::ops::DirFiller;
use super::types::{DirEntry, FileAttr};

/// Classification of a virtual path, before consulting the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualPath {
    /// The mount point itself.
    Root,
    /// `/<tag>`
    TagDir(String),
    /// `/<tag>/<base name>`
    FileLink { tag: String, name: String },
    /// Deeper than a file link, or not valid UTF-8. Never exists.
    Unknown,
}

impl VirtualPath {
    /// Split on `/`, dropping empty segments, and classify by depth.
    pub fn classify(path: &Path) -> Self {
        let Some(path) = path.to_str() else {
            return VirtualPath::Unknown;
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => VirtualPath::Root,
            [tag] => VirtualPath::TagDir((*tag).to_string()),
            [tag, name] => VirtualPath::FileLink {
                tag: (*tag).to_string(),
                name: (*name).to_string(),
            },
            _ => VirtualPath::Unknown,
        }
    }

    /// Whether this path can only ever be a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, VirtualPath::Root | VirtualPath::TagDir(_))
    }
}

/// A path that resolved to a live node.
#[derive(Debug, Clone)]
pub enum Node {
    Root,
    TagDir(String),
    /// A link to a tagged file that currently exists on disk.
    FileLink { target: PathBuf, attr: FileAttr },
}

/// Resolves virtual paths using only the tag index as ground truth.
///
/// Stateless across calls: each resolution issues fresh index queries, so
/// the answer is at most one query old. Index queries run on the blocking
/// pool since stores are free to block.
pub struct TagResolver {
    store: Arc<dyn TagStore>,
    /// Reported as the timestamps of the synthetic directories.
    created: SystemTime,
}

impl std::fmt::Debug for TagResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagResolver")
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl TagResolver {
    /// Create a resolver over the given index.
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self {
            store,
            created: SystemTime::now(),
        }
    }

    /// Get the underlying index.
    pub fn store(&self) -> &Arc<dyn TagStore> {
        &self.store
    }

    /// Run one index query on the blocking pool.
    async fn query<T, F>(&self, f: F) -> VfsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TagStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| VfsError::other(format!("spawn_blocking: {e}")))?
            .map_err(|e| {
                tracing::warn!(error = %e, "tag index query failed");
                VfsError::from(e)
            })
    }

    /// Resolve a path to a live node.
    pub async fn resolve(&self, path: &Path) -> VfsResult<Node> {
        match VirtualPath::classify(path) {
            VirtualPath::Root => Ok(Node::Root),
            VirtualPath::TagDir(name) => {
                let tag = name.clone();
                if self.query(move |store| store.tag_exists(&tag)).await? {
                    Ok(Node::TagDir(name))
                } else {
                    Err(VfsError::not_found(path.display().to_string()))
                }
            }
            VirtualPath::FileLink { tag, name } => {
                let entry = self
                    .query(move |store| store.find_file_by_tag_and_base_name(&tag, &name))
                    .await?
                    .ok_or_else(|| VfsError::not_found(path.display().to_string()))?;

                // A tag record alone is not enough; the target must be on disk.
                match tokio::fs::metadata(&entry.path).await {
                    Ok(meta) => Ok(Node::FileLink {
                        attr: FileAttr::symlink(entry.path.len() as u64, &meta),
                        target: PathBuf::from(entry.path),
                    }),
                    Err(e) => {
                        tracing::debug!(
                            path = %path.display(),
                            target = %entry.path,
                            error = %e,
                            "link target is gone"
                        );
                        Err(VfsError::not_found(path.display().to_string()))
                    }
                }
            }
            VirtualPath::Unknown => Err(VfsError::not_found(path.display().to_string())),
        }
    }

    /// Attributes of a resolved node.
    pub fn attr(&self, node: &Node) -> FileAttr {
        match node {
            Node::Root | Node::TagDir(_) => FileAttr::directory(self.created),
            Node::FileLink { attr, .. } => attr.clone(),
        }
    }

    /// Stream the listing of a directory path into `filler`.
    ///
    /// `.` and `..` come first, then either one directory per distinct tag
    /// name (root) or one link per tagged file (tag directory). Files that
    /// share a base name under one tag are each listed.
    pub async fn list(&self, path: &Path, filler: &mut DirFiller<'_>) -> VfsResult<()> {
        let entries: Vec<DirEntry> = match VirtualPath::classify(path) {
            VirtualPath::Root => self
                .query(|store| store.list_tag_names())
                .await?
                .into_iter()
                .map(DirEntry::directory)
                .collect(),
            VirtualPath::TagDir(name) => {
                let files = self
                    .query(move |store| store.list_files_for_tag(&name))
                    .await?;
                if files.is_empty() {
                    return Err(VfsError::not_found(path.display().to_string()));
                }
                files
                    .iter()
                    .filter_map(|entry| entry.base_name())
                    .map(DirEntry::symlink)
                    .collect()
            }
            VirtualPath::FileLink { .. } | VirtualPath::Unknown => {
                return Err(VfsError::not_found(path.display().to_string()));
            }
        };

        let dots = [DirEntry::directory("."), DirEntry::directory("..")];
        for entry in dots.into_iter().chain(entries) {
            if filler(entry).is_break() {
                tracing::trace!(path = %path.display(), "listing stopped by caller");
                break;
            }
        }
        Ok(())
    }
}
