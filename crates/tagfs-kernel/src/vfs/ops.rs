//! VFS operations trait.
//!
//! The call surface is the usual userspace-filesystem vocabulary, but only a
//! handful of read calls are real methods. Everything else shares one
//! rejection path, [`VfsOps::reject`].

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use strum::{Display, EnumIter, IntoStaticStr};

use super::VfsResult;
use super::error::VfsError;
use super::types::{DirEntry, FileAttr};

/// Every filesystem call the host dispatcher may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FsOp {
    Getattr,
    Opendir,
    Readdir,
    Releasedir,
    Readlink,
    Statfs,
    Mknod,
    Mkdir,
    Unlink,
    Rmdir,
    Link,
    Symlink,
    Rename,
    Chmod,
    Chown,
    Utimens,
    Access,
    Create,
    Open,
    Truncate,
    Read,
    Write,
    Flush,
    Release,
    Fsync,
    Fsyncdir,
    Setxattr,
    Getxattr,
    Removexattr,
    Listxattr,
}

impl FsOp {
    /// The read-only allow-list. Any other call is refused.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            FsOp::Getattr | FsOp::Opendir | FsOp::Readdir | FsOp::Releasedir | FsOp::Readlink
        )
    }
}

/// Sink for directory entries.
///
/// Returning [`ControlFlow::Break`] stops the listing early (for example
/// when the caller's reply buffer is full); the listing still succeeds.
pub type DirFiller<'a> = dyn FnMut(DirEntry) -> ControlFlow<()> + Send + 'a;

/// Core VFS operations trait.
///
/// All operations are path-based (no inode numbers). Paths are rooted at
/// the mount point; empty segments are ignored, so `""`, `"/"` and `"//"`
/// all name the root.
///
/// Implementations must be reentrant: the bridge issues calls concurrently
/// and never serializes them.
#[async_trait]
pub trait VfsOps: Send + Sync {
    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Check that a directory can be listed.
    ///
    /// No handle state is kept; every [`readdir`](Self::readdir) queries afresh.
    async fn opendir(&self, path: &Path) -> VfsResult<()>;

    /// Stream directory entries, including `.` and `..`, into `filler`.
    async fn readdir(&self, path: &Path, filler: &mut DirFiller<'_>) -> VfsResult<()>;

    /// Release a directory opened with [`opendir`](Self::opendir).
    async fn releasedir(&self, _path: &Path) -> VfsResult<()> {
        Ok(())
    }

    /// Read symbolic link target.
    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf>;

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool {
        true
    }

    /// The single fallback for every call outside the allow-list.
    ///
    /// Nothing is applied, partially or otherwise; the caller gets the
    /// returned error immediately.
    fn reject(&self, op: FsOp, path: &Path) -> VfsError {
        tracing::debug!(%op, path = %path.display(), "rejecting unsupported call");
        VfsError::not_supported(op, path.display().to_string())
    }

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Collect a whole directory listing, without `.` and `..`.
    async fn list(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        self.readdir(path, &mut |entry: DirEntry| {
            if !entry.is_dot() {
                entries.push(entry);
            }
            ControlFlow::Continue(())
        })
        .await?;
        Ok(entries)
    }
}
