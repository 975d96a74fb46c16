//! # tagfs-kernel
//!
//! Core of the tag filesystem: a read-only, path-based VFS that renders the
//! tag index as a three-level hierarchy.
//!
//! ```text
//! /                       every distinct tag name
//! /<tag>/                 one directory per tag
//! /<tag>/<file name>      symlink to the tagged file's real path
//! ```
//!
//! Nothing here knows how calls arrive; `tagfs-fuse` bridges the kernel's
//! FUSE protocol onto [`VfsOps`].

pub mod vfs;

pub use vfs::{
    DirEntry, DirFiller, FileAttr, FileType, FsOp, Node, TagBackend, TagResolver, VfsError,
    VfsOps, VfsResult, VirtualPath,
};
