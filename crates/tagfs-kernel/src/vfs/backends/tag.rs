//! Tag index backend.
//!
//! Answers the read-only call allow-list from a [`TagResolver`]; every other
//! call falls through to [`VfsOps::reject`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tagfs_store::TagStore;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::{DirFiller, VfsOps};
use crate::vfs::resolver::{Node, TagResolver, VirtualPath};
use crate::vfs::types::FileAttr;

/// Read-only view of a tag index.
///
/// Holds no per-call state. Concurrent calls are independent and only
/// share the store, which serializes itself.
#[derive(Debug)]
pub struct TagBackend {
    resolver: TagResolver,
}

impl TagBackend {
    /// Create a backend over the given index.
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self {
            resolver: TagResolver::new(store),
        }
    }

    /// Get the resolver.
    pub fn resolver(&self) -> &TagResolver {
        &self.resolver
    }
}

#[async_trait]
impl VfsOps for TagBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        tracing::trace!(path = %path.display(), "getattr");
        let node = self.resolver.resolve(path).await?;
        Ok(self.resolver.attr(&node))
    }

    async fn opendir(&self, path: &Path) -> VfsResult<()> {
        tracing::trace!(path = %path.display(), "opendir");
        // Links and deeper paths are never directories; skip the index.
        if !VirtualPath::classify(path).is_dir() {
            return Err(VfsError::not_found(path.display().to_string()));
        }
        self.resolver.resolve(path).await?;
        Ok(())
    }

    async fn readdir(&self, path: &Path, filler: &mut DirFiller<'_>) -> VfsResult<()> {
        tracing::trace!(path = %path.display(), "readdir");
        self.resolver.list(path, filler).await
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        tracing::trace!(path = %path.display(), "readlink");
        if !matches!(VirtualPath::classify(path), VirtualPath::FileLink { .. }) {
            return Err(VfsError::not_found(path.display().to_string()));
        }
        match self.resolver.resolve(path).await? {
            Node::FileLink { target, .. } => Ok(target),
            Node::Root | Node::TagDir(_) => Err(VfsError::not_found(path.display().to_string())),
        }
    }
}
