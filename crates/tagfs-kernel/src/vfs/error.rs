//! VFS error types.

use std::io;

use tagfs_store::StoreError;
use thiserror::Error;

use super::ops::FsOp;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path does not classify to any node.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call is outside the read-only allow-list.
    #[error("operation not supported: {op} on {path}")]
    NotSupported { op: FsOp, path: String },

    /// The tag index could not answer.
    #[error("tag index error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NotSupported error.
    pub fn not_supported(op: FsOp, path: impl Into<String>) -> Self {
        Self::NotSupported {
            op,
            path: path.into(),
        }
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns true for NotFound.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_))
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::NotSupported { op, path } => io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{op} not supported on {path}"),
            ),
            VfsError::Store(e) => io::Error::other(e),
            VfsError::Io(e) => e,
            VfsError::Other(msg) => io::Error::other(msg),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
