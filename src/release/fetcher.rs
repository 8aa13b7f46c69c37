//! Fetching release payloads over HTTP.

use super::Release;
use crate::error::{Error, Result};
use crate::http::{create_http_client, HttpClientConfig};
use crate::kvs::Kvs;

use futures::StreamExt;
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use tracing::{debug, info};

/// Downloads release artifacts and hands them to a store.
#[derive(Clone)]
pub struct Fetcher {
    client: ClientWithMiddleware,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher with its own HTTP client.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            client: create_http_client(config)?,
        })
    }

    /// Creates a fetcher sharing an existing client.
    pub fn with_client(client: ClientWithMiddleware) -> Self {
        Self { client }
    }

    /// Downloads the payload of `release`.
    ///
    /// When `limit` is set, payloads larger than `limit` bytes are refused with
    /// [`Error::CapacityExceeded`], from the announced length when there is one
    /// and otherwise as soon as the streamed body crosses it.
    pub async fn fetch(&self, release: &Release, limit: Option<u64>) -> Result<Vec<u8>> {
        debug!("Fetching {}", &release.url);
        let res = self
            .client
            .get(release.url.as_str())
            .send()
            .await?
            .error_for_status()?;

        let announced = res.content_length();
        if let (Some(limit), Some(len)) = (limit, announced) {
            if len > limit {
                return Err(Error::CapacityExceeded {
                    size: len,
                    max_size: limit,
                });
            }
        }

        let capacity = announced.unwrap_or(0).min(limit.unwrap_or(u64::MAX));
        let mut body = Vec::with_capacity(capacity as usize);
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let size = (body.len() + chunk.len()) as u64;
            if let Some(limit) = limit {
                if size > limit {
                    return Err(Error::CapacityExceeded {
                        size,
                        max_size: limit,
                    });
                }
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), &release.url);
        Ok(body)
    }

    /// Downloads `release` into `store` unless its key is already cached.
    ///
    /// Returns `true` when the payload was downloaded and written, `false`
    /// when the key was cached before or by a concurrent writer.
    pub async fn fetch_into<K>(
        &self,
        release: &Release,
        store: &K,
        limit: Option<u64>,
    ) -> Result<bool>
    where
        K: Kvs + ?Sized,
    {
        if store.contains(&release.key)? {
            debug!("Release {} is already cached", release.key);
            return Ok(false);
        }

        let data = self.fetch(release, limit).await?;
        match store.write(&release.key, &data) {
            Ok(()) => {
                info!("Cached release {} ({} bytes)", release.key, data.len());
                Ok(true)
            }
            Err(Error::KeyAlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
