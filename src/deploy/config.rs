//! Configuration structures for the deployer.

use crate::http::HttpClientConfig;

use std::env::current_dir;
use std::path::PathBuf;

/// Configuration structure for the deployer.
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    /// Directory under which each release is unpacked, one subdirectory per version.
    pub activation_dir: PathBuf,
    /// HTTP client settings used to fetch releases.
    pub http: HttpClientConfig,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            activation_dir: current_dir().unwrap_or_default(),
            http: HttpClientConfig::default(),
        }
    }
}
