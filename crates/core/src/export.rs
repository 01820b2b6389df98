//! Fetching remotely hosted document content for export.

use async_trait::async_trait;
use specsheet_files::{FilesError, PayloadError};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("stored content unavailable: {0}")]
    Blob(#[from] FilesError),
    #[error("stored payload is corrupt: {0}")]
    Payload(#[from] PayloadError),
}

/// Retrieves the bytes behind a remote `file_url`.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`ContentFetcher`] over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
