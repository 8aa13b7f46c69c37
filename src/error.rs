//! Error handling for the dewy cache.
//!
//! Every failure the store, the extractor or the release fetcher can produce
//! is a variant of [`Error`]. Errors are returned to the immediate caller;
//! nothing in this crate retries or swallows them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can happen when using dewy.
#[derive(Error, Debug)]
pub enum Error {
    /// The store root directory could not be created.
    #[error("Failed to initialize store root {}", display_root(.path))]
    Initialization {
        /// Requested root, `None` when a temporary directory was being created.
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    /// The store root is missing or is not a directory.
    #[error("Store root {path:?} is unavailable: {reason}")]
    RootUnavailable {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The size guard tripped before a write was attempted.
    #[error("Max size has been reached: {size} bytes used, ceiling is {max_size} bytes")]
    CapacityExceeded { size: u64, max_size: u64 },

    /// A write targeted a key that is already cached.
    #[error("Key already exists: {0}")]
    KeyAlreadyExists(String),

    /// A read or delete targeted a key that is not cached.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The key cannot be used as a file name directly under the store root.
    #[error("Invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// The source archive is missing or is not a valid zip file.
    #[error("Failed to open archive {path:?}: {message}")]
    ArchiveOpen {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// One archive entry could not be fully read or decompressed.
    #[error("Failed to read archive entry {name:?}: {message}")]
    EntryRead {
        name: String,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// One archive entry could not be materialized on disk.
    #[error("Failed to write archive entry {name:?} to {path:?}")]
    EntryWrite {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Error from an underlying system.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O Error.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error raised by the HTTP middleware stack (retries, tracing).
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

fn display_root(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("{:?}", p),
        None => "(temporary directory)".to_string(),
    }
}

/// Result type alias for operations that can fail with a dewy error.
pub type Result<T> = std::result::Result<T, Error>;
