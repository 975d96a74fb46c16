//! # tagfs-store
//!
//! Tag index persistence for tagfs.
//!
//! A file on disk is identified by its absolute path ([`FileEntry`]) and
//! carries any number of `name=value` labels ([`Tag`]). The virtual
//! filesystem only ever reads the index through the [`TagStore`] trait;
//! mutations live on [`TagDb`] and are driven by the command line.

mod db;
mod error;
mod model;
mod store;

pub use db::TagDb;
pub use error::{StoreError, StoreResult};
pub use model::{FileEntry, Tag, base_name, parse_tag, validate_tag_name};
pub use store::TagStore;
