//! # tagfs
//!
//! Command-line front end: tag files in the index, inspect and remove tags,
//! and mount the index as a read-only directory tree.

pub mod commands;
pub mod config;

pub use config::{Config, ConfigError};
