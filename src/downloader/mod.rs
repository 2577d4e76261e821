//! Per-asset downloader state machine and crawl driver
//!
//! # Overview
//!
//! A crawl is driven one page at a time:
//!
//! 1. **Creation**: a downloader for one [`crate::AssetType`] is created by
//!    [`crate::registry::DownloaderRegistry`] or restored from a checkpoint
//! 2. **Paging**: [`AssetDownloader::next_page`] requests the page at the
//!    current cursor, parses it and appends the new symbols
//! 3. **Driving**: [`CrawlDriver`] loops over pages, throttles, checkpoints
//!    periodically and on every abnormal exit
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticker_symbol_downloader::downloader::{AssetDownloader, PageOptions, StockDownloader};
//! use ticker_symbol_downloader::fetcher::http::HttpFetcher;
//! use ticker_symbol_downloader::Market;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut downloader = StockDownloader::new(Arc::new(HttpFetcher::new()?), 50);
//! let options = PageOptions {
//!     market: Market::Germany,
//!     ..PageOptions::default()
//! };
//! while !downloader.is_done() {
//!     let symbols = downloader.next_page(&options).await?;
//!     println!("Got {} new symbols", symbols.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! [`DownloadError`] separates transport failures, which are retried by
//! resuming the process later, from malformed content. Neither is retried in
//! process.

use async_trait::async_trait;

use crate::fetcher::FetcherError;
use crate::{AssetType, Market, Symbol};

pub mod config;
pub mod driver;
pub mod lookup;
pub mod profile;
pub mod state;

pub use driver::{CrawlDriver, CrawlError, CrawlOutcome, CrawlReport, CrawlState};
pub use lookup::{
    CurrencyDownloader, EtfDownloader, FutureDownloader, IndexDownloader, LookupDownloader,
    MutualFundDownloader, StockDownloader,
};
pub use profile::{AssetProfile, Exhaustion};
pub use state::{Counters, CrawlCursor, DownloaderSnapshot, DownloaderState};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Page could not be fetched
    #[error("network error: {0}")]
    Network(#[from] FetcherError),

    /// Page content could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Every market is already exhausted
    #[error("downloader is already done")]
    AlreadyDone,
}

/// Per-call paging options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    /// Use https rather than plaintext http
    pub secure: bool,
    /// Fail on malformed records instead of skipping them
    pub strict: bool,
    /// Market filter; only applied when the sweep plan is first fixed
    pub market: Market,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            secure: true,
            strict: false,
            market: Market::All,
        }
    }
}

/// Capabilities shared by every asset type's downloader
///
/// A downloader is mutated only through [`AssetDownloader::next_page`] and
/// by exactly one driver at a time.
#[async_trait]
pub trait AssetDownloader: Send {
    /// Asset type swept by this downloader
    fn asset_type(&self) -> AssetType;

    /// Fetch, parse and commit the page at the current cursor
    ///
    /// Returns only the symbols discovered by this call. On error nothing is
    /// committed and the cursor stays put.
    ///
    /// # Errors
    /// [`DownloadError::AlreadyDone`] when called after [`AssetDownloader::is_done`]
    /// became true, [`DownloadError::Network`] on transport failure and
    /// [`DownloadError::Parse`] on an unreadable page or, in strict mode, a
    /// malformed record.
    async fn next_page(&mut self, options: &PageOptions) -> Result<Vec<Symbol>, DownloadError>;

    /// Whether every planned market is exhausted
    fn is_done(&self) -> bool;

    /// Human readable progress counters
    fn progress_summary(&self) -> String;

    /// Collected symbols in discovery order
    fn collected_symbols(&self) -> Vec<&Symbol>;

    /// Export header row
    fn row_header(&self) -> Vec<String>;

    /// Export cells for one symbol, aligned with [`AssetDownloader::row_header`]
    fn project_row(&self, symbol: &Symbol) -> Vec<Option<String>>;

    /// Current pagination position
    fn cursor(&self) -> CrawlCursor;

    /// Progress counters
    fn counters(&self) -> Counters;

    /// Full persistable state
    fn snapshot(&self) -> DownloaderSnapshot;
}
