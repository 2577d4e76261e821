//! # Ticker Symbol Downloader Library
//!
//! Incrementally discovers every ticker symbol exposed by the Yahoo Finance
//! symbol lookup (stocks, ETFs, futures, indices, mutual funds and currencies),
//! persists progress so that a crawl lasting several hours can resume after an
//! interruption, and exports the collected records to tabular formats.
//!
//! ## Features
//!
//! - **Resumable crawls**: the full downloader state is checkpointed to disk
//!   periodically and on every abnormal exit
//! - **Market filter**: regional asset types can be restricted to one market
//! - **Strict mode**: malformed records can stop the crawl instead of being skipped
//! - **Polite crawling**: robots.txt is honoured and requests are throttled
//! - **Export**: CSV, JSON, YAML and xlsx with an optional exchange filter
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticker_symbol_downloader::downloader::{CrawlDriver, PageOptions};
//! use ticker_symbol_downloader::fetcher::http::HttpFetcher;
//! use ticker_symbol_downloader::registry::DownloaderRegistry;
//! use ticker_symbol_downloader::resume::CheckpointStore;
//! use ticker_symbol_downloader::AssetType;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new()?);
//! let registry = DownloaderRegistry::standard();
//! let mut downloader = registry.create(AssetType::Etf, fetcher, 50)?;
//!
//! let store = CheckpointStore::new("./checkpoints");
//! let mut driver = CrawlDriver::new(&store, PageOptions::default());
//! driver.run(downloader.as_mut()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`market`] - Market filters and sweep plans
//! - [`fetcher`] - Fetch capability, lookup requests, response parsing, robots policy
//! - [`downloader`] - Per-asset downloader state machine and the crawl driver
//! - [`registry`] - Asset type to downloader factory mapping
//! - [`resume`] - Versioned checkpoints and session locking
//! - [`output`] - Row projection and export sinks
//! - [`cli`] - Command line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Command line surface
pub mod cli;

/// Downloader state machine and crawl driver
pub mod downloader;

/// Fetch capability and lookup protocol
pub mod fetcher;

/// Market filters
pub mod market;

/// Crawl metrics
pub mod metrics;

/// Export sinks
pub mod output;

/// Asset type registry
pub mod registry;

/// Checkpoint persistence
pub mod resume;

/// Cooperative interrupt handling
pub mod shutdown;

pub use market::Market;

/// Kind of instrument swept by one downloader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// Common stocks (equities)
    Stocks,
    /// Exchange traded funds
    Etf,
    /// Futures contracts
    Future,
    /// Market indices
    Index,
    /// Mutual funds
    MutualFund,
    /// Currency pairs
    Currency,
}

impl AssetType {
    /// Every supported asset type, in CLI listing order
    pub const ALL: [AssetType; 6] = [
        AssetType::Stocks,
        AssetType::Etf,
        AssetType::Future,
        AssetType::Index,
        AssetType::MutualFund,
        AssetType::Currency,
    ];

    /// Stable key used on the command line and for checkpoint file names
    pub fn key(&self) -> &'static str {
        match self {
            AssetType::Stocks => "stocks",
            AssetType::Etf => "etf",
            AssetType::Future => "future",
            AssetType::Index => "index",
            AssetType::MutualFund => "mutualfund",
            AssetType::Currency => "currency",
        }
    }

    /// Value of the `type` query parameter understood by the lookup endpoint
    pub fn lookup_type(&self) -> &'static str {
        match self {
            AssetType::Stocks => "equity",
            AssetType::Etf => "etf",
            AssetType::Future => "future",
            AssetType::Index => "index",
            AssetType::MutualFund => "mutualfund",
            AssetType::Currency => "currency",
        }
    }

    /// Whether results are partitioned by regional market
    pub fn is_regional(&self) -> bool {
        !matches!(self, AssetType::Future | AssetType::Currency)
    }

    /// Space separated list of valid keys, for help and error messages
    pub fn valid_keys() -> String {
        Self::ALL
            .iter()
            .map(AssetType::key)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stocks" | "stock" => Ok(AssetType::Stocks),
            "etf" => Ok(AssetType::Etf),
            "future" => Ok(AssetType::Future),
            "index" => Ok(AssetType::Index),
            "mutualfund" => Ok(AssetType::MutualFund),
            "currency" => Ok(AssetType::Currency),
            other => Err(format!(
                "{other} is not a valid type option, expected one of: {}",
                Self::valid_keys()
            )),
        }
    }
}

/// Identity of a symbol within one asset type's collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    /// Ticker identifier
    pub ticker: String,
    /// Exchange code
    pub exchange: String,
}

/// Fields that only exist for some asset types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolDetails {
    /// No type-specific fields
    #[default]
    None,
    /// Currency pair legs, e.g. EUR / USD for `EURUSD=X`
    Currency {
        /// Base currency code
        base: String,
        /// Quote currency code
        quote: String,
    },
    /// Mutual fund classification
    MutualFund {
        /// Fund category
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Fund family
        #[serde(skip_serializing_if = "Option::is_none")]
        fund_family: Option<String>,
    },
    /// Futures contract metadata
    Future {
        /// Underlying instrument symbol
        #[serde(skip_serializing_if = "Option::is_none")]
        underlying: Option<String>,
    },
}

/// One discovered ticker record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Ticker identifier (e.g. "AAPL", "EURUSD=X")
    pub ticker: String,
    /// Display name
    pub name: Option<String>,
    /// Exchange code (e.g. "NYQ", "NMS")
    pub exchange: String,
    /// Human readable exchange name
    pub exchange_display: Option<String>,
    /// Asset type this symbol was collected for
    pub asset_type: AssetType,
    /// Human readable instrument type as reported upstream
    pub type_display: Option<String>,
    /// Type-specific fields
    #[serde(default)]
    pub details: SymbolDetails,
}

impl Symbol {
    /// Deduplication key: (ticker, exchange)
    pub fn key(&self) -> SymbolKey {
        SymbolKey {
            ticker: self.ticker.clone(),
            exchange: self.exchange.clone(),
        }
    }

    /// Validate symbol data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("Ticker cannot be empty".to_string());
        }

        if self.exchange.trim().is_empty() {
            return Err(format!("Exchange of {} cannot be empty", self.ticker));
        }

        if let SymbolDetails::Currency { base, quote } = &self.details {
            if base.len() != 3 || quote.len() != 3 {
                return Err(format!(
                    "Currency legs of {} must be three letter codes, got {base}/{quote}",
                    self.ticker
                ));
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({}) {}", self.ticker, self.exchange, name),
            None => write!(f, "{} ({})", self.ticker, self.exchange),
        }
    }
}
