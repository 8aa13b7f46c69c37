//! Core deployer implementation.

use super::config::DeployerConfig;
use crate::archive::ZipArchive;
use crate::error::{Error, Result};
use crate::kvs::{CapacityCheck, File, Kvs};
use crate::release::{Fetcher, Release};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Outcome of a successful [`Deployer::deploy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Store key of the release archive.
    pub key: String,
    /// Path of the cached archive inside the store.
    pub archive: PathBuf,
    /// Directory the archive was unpacked into.
    pub destination: PathBuf,
    /// Path of the last extracted entry.
    pub extracted: PathBuf,
    /// Top-level entries of the archive, relative to `destination`.
    pub top_level: Vec<String>,
    /// `true` when the archive was served from the store without downloading.
    pub from_cache: bool,
}

impl Deployment {
    /// The directory to activate.
    ///
    /// Archives wrapping their content in a single top-level directory
    /// resolve to that directory, everything else to `destination`.
    pub fn root(&self) -> PathBuf {
        match self.top_level.as_slice() {
            [single] if self.destination.join(single).is_dir() => self.destination.join(single),
            _ => self.destination.clone(),
        }
    }
}

/// Fetches, caches and unpacks releases.
#[derive(Debug, Clone)]
pub struct Deployer {
    config: DeployerConfig,
    store: Arc<File>,
    fetcher: Fetcher,
}

impl Deployer {
    pub(crate) fn new(config: DeployerConfig, store: Arc<File>, fetcher: Fetcher) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    /// Gets the store caching release archives.
    pub fn store(&self) -> &Arc<File> {
        &self.store
    }

    /// Gets the directory releases are unpacked into.
    pub fn activation_dir(&self) -> &Path {
        &self.config.activation_dir
    }

    /// Gets the number of retries per request.
    pub fn retries(&self) -> u32 {
        self.config.http.retries
    }

    /// Downloads `release` unless cached, then unpacks it under
    /// `activation_dir/<version>`.
    pub async fn deploy(&self, release: &Release) -> Result<Deployment> {
        let archive = self.store.path(&release.key)?;

        let store = self.store.clone();
        let key = release.key.clone();
        let mut from_cache = blocking(move || store.contains(&key)).await?;

        if !from_cache {
            let data = self.fetcher.fetch(release, self.remaining_capacity()).await?;
            let size = data.len();
            let store = self.store.clone();
            let key = release.key.clone();
            match blocking(move || store.write(&key, &data)).await {
                Ok(()) => info!("Cached release {} ({} bytes)", release.key, size),
                // A concurrent deploy cached the same release first.
                Err(Error::KeyAlreadyExists(_)) => from_cache = true,
                Err(e) => return Err(e),
            }
        }

        let destination = self.config.activation_dir.join(release.version());
        let (extracted, top_level) = {
            let archive = archive.clone();
            let destination = destination.clone();
            blocking(move || {
                let zip = ZipArchive::open(&archive)?;
                let extracted = zip.extract_to(&destination)?;
                Ok((extracted, zip.top_level_names()))
            })
            .await?
        };

        info!("Unpacked release {} into {:?}", release.key, destination);
        Ok(Deployment {
            key: release.key.clone(),
            archive,
            destination,
            extracted,
            top_level,
            from_cache,
        })
    }

    /// Removes a cached release so that the next deploy downloads it again.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        self.store.delete(key)
    }

    /// Bytes the store can still accept, when it keeps an exact count.
    fn remaining_capacity(&self) -> Option<u64> {
        match self.store.capacity_check() {
            CapacityCheck::Tracked => Some(self.store.max_size().saturating_sub(self.store.usage())),
            CapacityCheck::DirectorySize => None,
        }
    }
}

/// Runs blocking filesystem work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}
