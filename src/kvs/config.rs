//! Configuration and defaults for the file store.

use std::path::PathBuf;

/// Default ceiling for the aggregate size of a store root: 64 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024 * 1024;

/// Prefix of the temporary directory created when no root is configured.
pub const TEMP_DIR_PREFIX: &str = "dewy-";

/// How the store measures its size before accepting a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityCheck {
    /// Keep a running byte counter of the cached files.
    ///
    /// The counter is seeded from the top-level files found when the store is
    /// built and updated on every write and delete. A write is refused when
    /// the counter already exceeds the ceiling or when the payload would push
    /// it past the ceiling.
    #[default]
    Tracked,
    /// Compare the size the filesystem reports for the root directory entry
    /// itself against the ceiling.
    ///
    /// This is a coarse O(1) stat: most filesystems report a block-sized
    /// value unrelated to the cached content.
    DirectorySize,
}

/// Configuration structure for the file store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root directory. A fresh temporary directory is created when unset.
    pub directory: Option<PathBuf>,
    /// Ceiling for the aggregate size of the root, in bytes.
    pub max_size: u64,
    /// Size accounting strategy used by the pre-write guard.
    pub capacity_check: CapacityCheck,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_size: DEFAULT_MAX_SIZE,
            capacity_check: CapacityCheck::default(),
        }
    }
}
