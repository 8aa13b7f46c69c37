//! Release artifacts and the fetcher that brings them into a store.
//!
//! - [`release`] - The [`Release`] struct and key derivation from URLs
//! - [`fetcher`] - The [`Fetcher`] downloading release payloads
//!
//! ```rust,no_run
//! use dewy::kvs::FileBuilder;
//! use dewy::release::{Fetcher, Release};
//! use dewy::HttpClientConfig;
//!
//! # async fn example() -> Result<(), dewy::Error> {
//! let store = FileBuilder::new().build()?;
//! let release = Release::try_from("https://example.com/releases/v1.2.0.zip")?;
//! let fetcher = Fetcher::new(HttpClientConfig::default())?;
//! let downloaded = fetcher.fetch_into(&release, &store, Some(store.max_size())).await?;
//! # Ok(())
//! # }
//! ```

pub mod fetcher;
pub mod release;

pub use fetcher::Fetcher;
pub use release::Release;
