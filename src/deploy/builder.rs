//! Builder pattern implementation for creating [`Deployer`] instances.

use super::{config::DeployerConfig, deployer::Deployer};
use crate::error::Result;
use crate::kvs::{File, StoreConfig};
use crate::release::Fetcher;

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A builder used to create a [`Deployer`].
///
/// ```rust
/// use dewy::deploy::DeployerBuilder;
///
/// # fn main() -> Result<(), dewy::Error> {
/// let d = DeployerBuilder::new().retries(5).activation_dir("releases".into()).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DeployerBuilder {
    config: DeployerConfig,
    store: Option<Arc<File>>,
}

impl DeployerBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DeployerBuilder::default()
    }

    /// Sets the store used to cache release archives.
    ///
    /// Without one, a store with the default configuration is created.
    pub fn store(mut self, store: Arc<File>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the directory where releases are unpacked.
    pub fn activation_dir(mut self, activation_dir: PathBuf) -> Self {
        self.config.activation_dir = activation_dir;
        self
    }

    /// Set the number of retries per request.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.http.retries = retries;
        self
    }

    /// Set the timeout of each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = Some(timeout);
        self
    }

    /// Route requests through a proxy.
    pub fn proxy(mut self, proxy: reqwest::Proxy) -> Self {
        self.config.http.proxy = Some(proxy);
        self
    }

    /// Set whether proxies from the environment are honoured.
    pub fn system_proxy(mut self, enabled: bool) -> Self {
        self.config.http.system_proxy = enabled;
        self
    }

    /// Add the http headers, merged with any headers set before.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.config.http.headers.take().unwrap_or_default();
        new.extend(headers);

        self.config.http.headers = Some(new);
        self
    }

    /// Add the http header.
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue};
    /// use dewy::deploy::DeployerBuilder;
    ///
    /// let auth = HeaderValue::from_static("token ghp_example");
    /// let builder = DeployerBuilder::new().header(header::AUTHORIZATION, auth);
    /// ```
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.config.http.headers.take().unwrap_or_default();
        new.insert(name, value);

        self.config.http.headers = Some(new);
        self
    }

    /// Create the [`Deployer`] with the specified options.
    pub fn build(self) -> Result<Deployer> {
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(File::new(StoreConfig::default())?),
        };
        let fetcher = Fetcher::new(self.config.http.clone())?;
        Ok(Deployer::new(self.config, store, fetcher))
    }
}
