//! Key-value stores for cached release artifacts.
//!
//! This module provides the [`Kvs`] abstraction and its filesystem-backed
//! implementation, [`File`]. A key names one artifact (typically a release
//! version) and maps to exactly one file directly under the store root.
//!
//! # Overview
//!
//! - `file` - The directory-backed [`File`] store
//! - `builder` - [`FileBuilder`] for configuring a store
//! - `config` - [`StoreConfig`], defaults and [`CapacityCheck`]
//!
//! # Examples
//!
//! ```rust
//! use dewy::kvs::{FileBuilder, Kvs};
//!
//! # fn example() -> Result<(), dewy::Error> {
//! let store = FileBuilder::new().max_size(1024 * 1024).build()?;
//! store.write("v1.0.0.zip", b"payload")?;
//! assert_eq!(store.read("v1.0.0.zip")?, b"payload");
//! assert_eq!(store.list()?, vec!["v1.0.0.zip".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod file;

pub use builder::FileBuilder;
pub use config::{CapacityCheck, StoreConfig, DEFAULT_MAX_SIZE, TEMP_DIR_PREFIX};
pub use file::File;

use crate::error::Result;

/// A store of immutable, named byte blobs.
///
/// Implementations never overwrite an existing key: invalidating a cached
/// artifact means deleting it and writing it again.
pub trait Kvs: Send + Sync {
    /// Returns the exact bytes stored under `key`.
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Stores `data` under `key`, failing if the key already exists.
    fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Removes `key` from the store.
    fn delete(&self, key: &str) -> Result<()>;

    /// Lists every key currently present.
    fn list(&self) -> Result<Vec<String>>;

    /// Whether `key` is currently present.
    fn contains(&self, key: &str) -> Result<bool>;
}
