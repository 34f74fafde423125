//! Image download facility

use crate::error::{Error, Result};
use crate::utils::remove_file_idempotent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Result of one download attempt that reached the server
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOutcome {
    /// HTTP status returned by the server
    pub status: u16,
    /// Local path the body was written to
    pub path: PathBuf,
}

impl FetchOutcome {
    /// Downloads count as successful only with status 200
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Downloads a remote resource to a local path
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` to `dest`
    ///
    /// A response that arrives with any status is an `Ok` outcome; only
    /// transport failures and local write failures are errors.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome>;
}

/// [`Fetcher`] using a shared reqwest client
///
/// The body is written only for status 200, so failed downloads never leave
/// a file behind.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let outcome = FetchOutcome {
            status,
            path: dest.to_path_buf(),
        };
        if status != 200 {
            debug!(%url, status, "download returned non-success status");
            return Ok(outcome);
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let written = async {
            let mut bytes = 0u64;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                bytes += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<u64, Error>(bytes)
        }
        .await;

        match written {
            Ok(bytes) => {
                debug!(%url, ?dest, bytes, "download complete");
                Ok(outcome)
            }
            Err(e) => {
                drop(file);
                remove_file_idempotent(dest).await.ok();
                Err(e)
            }
        }
    }
}
