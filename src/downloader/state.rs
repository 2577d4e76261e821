//! Downloader state and its persisted form
//!
//! [`DownloaderState`] is the live, mutable state of one asset type's crawl.
//! [`DownloaderSnapshot`] is the explicit schema written into checkpoints;
//! the conversion between the two is validated so a restored downloader is
//! never partially initialized.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::{AssetType, Market, Symbol, SymbolKey};

/// Pagination position: market sweep step, then record offset within it
///
/// Ordering is lexicographic, and a crawl only ever moves it forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct CrawlCursor {
    /// Index into the sweep plan
    pub market_index: usize,
    /// Offset of the next record to request within the current market
    pub offset: u64,
}

impl CrawlCursor {
    /// Move past `items` records in the current market
    pub fn advance(&mut self, items: u64) {
        self.offset = self.offset.saturating_add(items);
    }

    /// Move to the start of the next market
    pub fn next_market(&mut self) {
        self.market_index += 1;
        self.offset = 0;
    }
}

/// Progress counters, for reporting only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Counters {
    /// Pages successfully fetched and committed
    pub pages_fetched: u64,
    /// Unique symbols collected
    pub symbols_collected: u64,
    /// Records dropped because their key was already collected
    pub duplicates_skipped: u64,
    /// Malformed records skipped in relaxed mode
    pub malformed_skipped: u64,
}

/// Persisted schema of a downloader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloaderSnapshot {
    /// Asset type swept
    pub asset_type: AssetType,
    /// Page size fixed for the session
    pub page_size: u32,
    /// Sweep plan; empty until the first page is requested
    pub markets: Vec<Market>,
    /// Pagination position
    pub cursor: CrawlCursor,
    /// Whether every planned market is exhausted
    pub done: bool,
    /// Collected symbols in discovery order
    pub collected: Vec<Symbol>,
    /// Progress counters
    pub counters: Counters,
}

/// Live downloader state
#[derive(Debug, Clone)]
pub struct DownloaderState {
    pub(crate) asset_type: AssetType,
    pub(crate) page_size: u32,
    pub(crate) markets: Vec<Market>,
    pub(crate) cursor: CrawlCursor,
    pub(crate) done: bool,
    pub(crate) collected: IndexMap<SymbolKey, Symbol>,
    pub(crate) counters: Counters,
}

impl DownloaderState {
    /// Fresh state with no sweep plan yet
    pub fn new(asset_type: AssetType, page_size: u32) -> Self {
        Self {
            asset_type,
            page_size,
            markets: Vec::new(),
            cursor: CrawlCursor::default(),
            done: false,
            collected: IndexMap::new(),
            counters: Counters::default(),
        }
    }

    /// Rebuild state from a snapshot, rejecting inconsistent data
    pub fn from_snapshot(snapshot: DownloaderSnapshot) -> Result<Self, String> {
        if snapshot.page_size == 0 {
            return Err("page size must be positive".to_string());
        }

        if snapshot.markets.is_empty() {
            if snapshot.done || snapshot.cursor != CrawlCursor::default() {
                return Err("cursor has advanced without a sweep plan".to_string());
            }
        } else if snapshot.cursor.market_index > snapshot.markets.len()
            || (!snapshot.done && snapshot.cursor.market_index == snapshot.markets.len())
        {
            return Err(format!(
                "market index {} is outside a sweep plan of {} market(s)",
                snapshot.cursor.market_index,
                snapshot.markets.len()
            ));
        }

        let mut collected = IndexMap::with_capacity(snapshot.collected.len());
        for symbol in snapshot.collected {
            if symbol.asset_type != snapshot.asset_type {
                return Err(format!(
                    "symbol {} belongs to {}, not {}",
                    symbol.ticker, symbol.asset_type, snapshot.asset_type
                ));
            }
            let key = symbol.key();
            if collected.insert(key, symbol).is_some() {
                return Err("duplicate symbol key in collection".to_string());
            }
        }

        Ok(Self {
            asset_type: snapshot.asset_type,
            page_size: snapshot.page_size,
            markets: snapshot.markets,
            cursor: snapshot.cursor,
            done: snapshot.done,
            collected,
            counters: snapshot.counters,
        })
    }

    /// Persistable copy of the full state
    pub fn snapshot(&self) -> DownloaderSnapshot {
        DownloaderSnapshot {
            asset_type: self.asset_type,
            page_size: self.page_size,
            markets: self.markets.clone(),
            cursor: self.cursor,
            done: self.done,
            collected: self.collected.values().cloned().collect(),
            counters: self.counters,
        }
    }

    /// Fix the sweep plan on first use; later calls keep the persisted plan
    pub fn ensure_plan(&mut self, requested: Market) {
        let plan = requested.sweep_plan(self.asset_type);
        if self.markets.is_empty() {
            self.markets = plan;
        } else if self.markets != plan {
            warn!(
                asset_type = %self.asset_type,
                requested = %requested,
                persisted = ?self.markets,
                "Market filter differs from the resumed session, keeping the persisted sweep plan"
            );
        }
    }

    /// Market of the current sweep step
    pub fn current_market(&self) -> Option<Market> {
        self.markets.get(self.cursor.market_index).copied()
    }

    /// Append the symbols of a page that are not yet collected
    ///
    /// Returns the newly added symbols in page order.
    pub fn insert_new(&mut self, symbols: Vec<Symbol>) -> Vec<Symbol> {
        let mut seen_in_page = HashSet::new();
        let mut added = Vec::new();

        for symbol in symbols {
            let key = symbol.key();
            if self.collected.contains_key(&key) || !seen_in_page.insert(key.clone()) {
                self.counters.duplicates_skipped += 1;
                continue;
            }
            self.collected.insert(key, symbol.clone());
            added.push(symbol);
        }

        self.counters.symbols_collected = self.collected.len() as u64;
        added
    }
}
