//! Builder pattern implementation for creating [`File`] stores.
//!
//! ```rust
//! use dewy::kvs::{CapacityCheck, FileBuilder};
//!
//! # fn example() -> Result<(), dewy::Error> {
//! let dir = tempfile::tempdir()?;
//! let store = FileBuilder::new()
//!     .directory(dir.path().join("cache"))
//!     .max_size(16 * 1024 * 1024)
//!     .capacity_check(CapacityCheck::DirectorySize)
//!     .build()?;
//! assert_eq!(store.root_path(), dir.path().join("cache"));
//! # Ok(())
//! # }
//! ```

use super::config::{CapacityCheck, StoreConfig};
use super::file::File;
use crate::error::Result;

use std::path::PathBuf;

/// A builder used to create a [`File`] store.
#[derive(Debug, Default, Clone)]
pub struct FileBuilder {
    config: StoreConfig,
}

impl FileBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        FileBuilder::default()
    }

    /// Sets the root directory. It is created if missing.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = Some(directory);
        self
    }

    /// Sets the ceiling for the aggregate size of the root, in bytes.
    pub fn max_size(mut self, max_size: u64) -> Self {
        self.config.max_size = max_size;
        self
    }

    /// Sets how the pre-write guard measures the store size.
    pub fn capacity_check(mut self, capacity_check: CapacityCheck) -> Self {
        self.config.capacity_check = capacity_check;
        self
    }

    /// Create the [`File`] store, creating its root directory.
    pub fn build(self) -> Result<File> {
        File::new(self.config)
    }
}
