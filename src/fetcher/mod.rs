//! Fetch capability and symbol lookup protocol
//!
//! The crawl engine only ever talks to the network through the [`Fetch`]
//! trait, so the transport can be swapped for an in-memory implementation.

use async_trait::async_trait;

pub mod http;
pub mod lookup;
pub mod parser;
pub mod robots;

pub use lookup::PageRequest;
pub use parser::{LookupPage, LookupParser};
pub use robots::{RobotsPolicy, RobotsTxt};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Transport failure (connection, timeout, TLS, body read)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// A request URL could not be built
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),
}

impl FetcherError {
    /// Whether this is a client error status (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, FetcherError::HttpStatus { status, .. } if (400..500).contains(status))
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Network capability used by downloaders and the robots check
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch `url` and return the raw response body
    ///
    /// # Errors
    /// Returns [`FetcherError::NetworkError`] on transport failure and
    /// [`FetcherError::HttpStatus`] on non-success responses.
    async fn fetch(&self, url: &str, user_agent: &str) -> FetcherResult<Vec<u8>>;
}
