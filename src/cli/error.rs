//! CLI error types and conversions

use crate::downloader::CrawlError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::registry::RegistryError;
use crate::resume::ResumeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Unknown asset type on the command line
    #[error("{0}")]
    InvalidAssetType(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Registry error
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// Crawl error
    #[error("crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Resume error
    #[error("resume error: {0}")]
    Resume(#[from] ResumeError),
}

impl CliError {
    /// Process exit code; every failure, including an unknown asset type and a
    /// robots refusal, exits with 1
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether the crawl was refused by robots.txt
    pub fn is_policy(&self) -> bool {
        matches!(self, CliError::Crawl(CrawlError::Policy(_)))
    }
}
