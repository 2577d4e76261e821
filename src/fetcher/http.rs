//! reqwest-backed implementation of the fetch capability

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::downloader::config::REQUEST_TIMEOUT;
use crate::fetcher::{Fetch, FetcherError, FetcherResult};

/// HTTP fetcher with a fixed request timeout
///
/// Requests are issued one at a time by the crawl driver, so a single
/// pooled client is sufficient.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher using the default request timeout
    pub fn new() -> FetcherResult<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| FetcherError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, user_agent: &str) -> FetcherResult<Vec<u8>> {
        debug!(url = %url, "Sending GET request");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Non-success response");
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetcherError::NetworkError(format!("Failed to read body: {e}")))?;

        debug!(url = %url, bytes = body.len(), "Response received");
        Ok(body.to_vec())
    }
}
