//! Remote playlist retrieval
//!
//! [`SourceFetcher`] is the seam the pool builder fetches through, so tests can
//! script source behaviour without a network.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::errors::{AppError, AppResult, SourceError, SourceResult};

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the playlist text behind `url`. Any failure (timeout, transport,
    /// non-success status, unreadable body) is a [`SourceError`].
    async fn fetch(&self, url: &str) -> SourceResult<String>;
}

/// reqwest-backed fetcher with a hard per-request timeout
pub struct HttpSourceFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpSourceFetcher {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> AppResult<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> SourceResult<String> {
        debug!("Fetching source {} (timeout {:?})", url, self.timeout);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http(status.as_u16(), url));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(url, &e))?;

        debug!("Fetched {} bytes from {}", text.len(), url);
        Ok(text)
    }
}
