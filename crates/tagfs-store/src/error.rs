//! Store error types.

use thiserror::Error;

/// Tag index error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite database failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A tag name that cannot be shown as a directory name.
    #[error("invalid tag name: {0:?}")]
    InvalidTagName(String),

    /// The index cannot be read at all.
    #[error("tag index unavailable: {0}")]
    Unavailable(String),
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;
