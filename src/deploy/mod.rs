//! The fetch → cache → unpack pipeline.
//!
//! A [`Deployer`] composes a [`File`](crate::kvs::File) store, a
//! [`Fetcher`](crate::release::Fetcher) and the zip extractor. Each call to
//! [`Deployer::deploy`] downloads a release only when its key is not cached
//! yet, then unpacks the cached archive into the activation directory.
//!
//! - `deployer` - Core [`Deployer`] and the [`Deployment`] report
//! - `builder` - [`DeployerBuilder`]
//! - `config` - [`DeployerConfig`]
//!
//! ```rust,no_run
//! use dewy::deploy::DeployerBuilder;
//! use dewy::release::Release;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), dewy::Error> {
//! let deployer = DeployerBuilder::new()
//!     .activation_dir(PathBuf::from("/srv/app/releases"))
//!     .retries(5)
//!     .build()?;
//!
//! let release = Release::try_from("https://example.com/download/v1.2.0.zip")?;
//! let deployment = deployer.deploy(&release).await?;
//! println!("activate {}", deployment.destination.display());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod deployer;

pub use builder::DeployerBuilder;
pub use config::DeployerConfig;
pub use deployer::{Deployer, Deployment};
