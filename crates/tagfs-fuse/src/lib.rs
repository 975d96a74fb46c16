//! # tagfs-fuse
//!
//! Mounts a [`VfsOps`] implementation through FUSE.
//!
//! The kernel speaks inodes; the tag view is path-based. [`InodeTable`]
//! keeps the two in step, and [`TagFs`] turns every kernel request into an
//! independent task on a tokio runtime so slow index queries never hold up
//! other callers.
//!
//! [`VfsOps`]: tagfs_kernel::VfsOps

mod attr;
mod errno;
mod fs;
mod inode;
mod mount;

pub use attr::{BLOCK_SIZE, Owner, TTL};
pub use errno::errno;
pub use fs::TagFs;
pub use inode::{InodeTable, ROOT_INO, UNKNOWN_INO};
pub use mount::{MountOptions, mount};
