//! Dewy is the local artifact cache of a self-updating deployment agent.
//!
//! Downloaded release archives are stored by key in a directory-backed store
//! with a size ceiling, then unpacked into an activation directory without
//! downloading them again.
//!
//! # Quick Start
//!
//! ```rust
//! use dewy::kvs::{FileBuilder, Kvs};
//!
//! # fn main() -> Result<(), dewy::Error> {
//! let store = FileBuilder::new().max_size(1024).build()?;
//! store.write("v1", b"release bytes")?;
//! assert_eq!(store.read("v1")?, b"release bytes");
//! store.delete("v1")?;
//! assert!(store.list()?.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`kvs`] - The [`Kvs`] trait and the [`File`] store
//! - [`archive`] - Zip extraction preserving paths and file modes
//! - [`release`] - [`Release`] artifacts and the HTTP [`Fetcher`]
//! - [`deploy`] - The fetch → cache → unpack [`Deployer`]
//! - [`http`] - HTTP client with retry and tracing middleware
//! - [`error`] - The crate-wide [`Error`] enum

pub mod archive;
pub mod deploy;
pub mod error;
pub mod http;
pub mod kvs;
pub mod release;

pub use archive::{extract, ZipArchive, ZipFileInfo};
pub use deploy::{Deployer, DeployerBuilder, Deployment};
pub use error::{Error, Result};
pub use http::{create_http_client, HttpClientConfig};
pub use kvs::{CapacityCheck, File, FileBuilder, Kvs, StoreConfig};
pub use release::{Fetcher, Release};
