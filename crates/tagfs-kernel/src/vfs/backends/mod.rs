//! VFS backend implementations.

mod tag;

pub use tag::TagBackend;
