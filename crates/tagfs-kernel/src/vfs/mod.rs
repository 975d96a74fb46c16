//! Virtual Filesystem over the tag index.
//!
//! Key components:
//!
//! - [`VirtualPath`] - Classifies a path into root, tag directory or file link
//! - [`TagResolver`] - Computes attributes and listings from the [`TagStore`]
//! - [`VfsOps`] - The filesystem call surface (read-only allow-list + one rejection path)
//! - [`TagBackend`] - [`VfsOps`] over a [`TagResolver`]
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   The FUSE bridge handles inode ↔ path mapping locally.
//! - **Stateless**: Every call is resolved against the live index. No
//!   directory contents or attributes are kept between calls.
//! - **Read-only**: Anything that would change the index or a file is
//!   refused through [`VfsOps::reject`].
//!
//! [`TagStore`]: tagfs_store::TagStore

pub mod backends;
mod error;
mod ops;
mod resolver;
mod types;

pub use backends::TagBackend;
pub use error::{VfsError, VfsResult};
pub use ops::{DirFiller, FsOp, VfsOps};
pub use resolver::{Node, TagResolver, VirtualPath};
pub use types::{DirEntry, FileAttr, FileType};
