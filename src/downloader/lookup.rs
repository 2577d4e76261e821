//! Paginated lookup downloader
//!
//! One state machine serves every asset type; the [`AssetProfile`] type
//! parameter supplies the per-type parsing, exhaustion rule and columns.

use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::USER_AGENT;
use super::profile::{
    base_cells, AssetProfile, Currencies, Etfs, Exhaustion, Futures, Indices, MutualFunds,
    Stocks, BASE_HEADERS,
};
use super::state::{Counters, CrawlCursor, DownloaderSnapshot, DownloaderState};
use super::{AssetDownloader, DownloadError, PageOptions};
use crate::fetcher::{Fetch, LookupParser, PageRequest};
use crate::{AssetType, Symbol};

/// Downloader for stocks
pub type StockDownloader = LookupDownloader<Stocks>;
/// Downloader for exchange traded funds
pub type EtfDownloader = LookupDownloader<Etfs>;
/// Downloader for futures
pub type FutureDownloader = LookupDownloader<Futures>;
/// Downloader for indices
pub type IndexDownloader = LookupDownloader<Indices>;
/// Downloader for mutual funds
pub type MutualFundDownloader = LookupDownloader<MutualFunds>;
/// Downloader for currency pairs
pub type CurrencyDownloader = LookupDownloader<Currencies>;

/// Lookup downloader for the asset type described by `P`
pub struct LookupDownloader<P: AssetProfile> {
    fetcher: Arc<dyn Fetch>,
    state: DownloaderState,
    _profile: PhantomData<fn() -> P>,
}

impl<P: AssetProfile> LookupDownloader<P> {
    /// Fresh downloader at the start of its sweep
    pub fn new(fetcher: Arc<dyn Fetch>, page_size: u32) -> Self {
        Self {
            fetcher,
            state: DownloaderState::new(P::ASSET_TYPE, page_size),
            _profile: PhantomData,
        }
    }

    /// Downloader resumed from a persisted snapshot
    ///
    /// # Errors
    /// Returns a reason when the snapshot belongs to another asset type or is
    /// internally inconsistent.
    pub fn restore(fetcher: Arc<dyn Fetch>, snapshot: DownloaderSnapshot) -> Result<Self, String> {
        if snapshot.asset_type != P::ASSET_TYPE {
            return Err(format!(
                "snapshot holds {} state, expected {}",
                snapshot.asset_type,
                P::ASSET_TYPE
            ));
        }

        Ok(Self {
            fetcher,
            state: DownloaderState::from_snapshot(snapshot)?,
            _profile: PhantomData,
        })
    }

    /// Parse every record of a page
    ///
    /// Strict mode fails on the first malformed record before anything is
    /// committed; relaxed mode skips it and counts it.
    fn parse_items(
        &self,
        items: &[Value],
        strict: bool,
    ) -> Result<(Vec<Symbol>, u64), DownloadError> {
        let mut symbols = Vec::with_capacity(items.len());
        let mut skipped = 0;

        for (position, record) in items.iter().enumerate() {
            match LookupParser::parse_record(record, P::ASSET_TYPE, P::details) {
                Ok(symbol) => symbols.push(symbol),
                Err(reason) if strict => {
                    return Err(DownloadError::Parse(format!(
                        "malformed {} record at offset {}: {reason}",
                        P::ASSET_TYPE,
                        self.state.cursor.offset + position as u64
                    )));
                }
                Err(reason) => {
                    warn!(
                        asset_type = %P::ASSET_TYPE,
                        offset = self.state.cursor.offset + position as u64,
                        reason = %reason,
                        "Skipping malformed record"
                    );
                    skipped += 1;
                }
            }
        }

        Ok((symbols, skipped))
    }

    /// A page of only malformed records parses to nothing but is not a repeat,
    /// so the "no new symbols" rule needs at least one parsed record
    fn market_exhausted(
        &self,
        items: u64,
        parsed: usize,
        added: usize,
        total: Option<u64>,
    ) -> bool {
        if items == 0 || (parsed > 0 && added == 0) {
            return true;
        }
        match P::EXHAUSTION {
            Exhaustion::EmptyPage => false,
            Exhaustion::ShortPage => items < u64::from(self.state.page_size),
            Exhaustion::TotalCount => {
                total.is_some_and(|total| self.state.cursor.offset + items >= total)
            }
        }
    }
}

#[async_trait]
impl<P: AssetProfile> AssetDownloader for LookupDownloader<P> {
    fn asset_type(&self) -> AssetType {
        P::ASSET_TYPE
    }

    async fn next_page(&mut self, options: &PageOptions) -> Result<Vec<Symbol>, DownloadError> {
        if self.state.done {
            return Err(DownloadError::AlreadyDone);
        }

        self.state.ensure_plan(options.market);
        let Some(market) = self.state.current_market() else {
            self.state.done = true;
            return Ok(Vec::new());
        };

        let url = PageRequest::new(
            P::ASSET_TYPE,
            market,
            self.state.cursor.offset,
            self.state.page_size,
        )
        .secure(options.secure)
        .url()?;
        debug!(
            url = %url,
            market = %market,
            offset = self.state.cursor.offset,
            "Requesting lookup page"
        );

        let body = self.fetcher.fetch(&url, USER_AGENT).await?;
        let page =
            LookupParser::parse_page(&body).map_err(|e| DownloadError::Parse(e.to_string()))?;
        let (symbols, skipped) = self.parse_items(&page.items, options.strict)?;

        // Nothing has been mutated until here, so a failed page leaves the
        // downloader exactly where it was
        let items = page.items.len() as u64;
        let parsed = symbols.len();
        let added = self.state.insert_new(symbols);
        self.state.counters.malformed_skipped += skipped;
        self.state.counters.pages_fetched += 1;
        crate::metrics::record_page(added.len() as u64, skipped);

        if self.market_exhausted(items, parsed, added.len(), page.total) {
            info!(
                asset_type = %P::ASSET_TYPE,
                market = %market,
                offset = self.state.cursor.offset + items,
                "Market exhausted"
            );
            self.state.cursor.next_market();
            if self.state.cursor.market_index >= self.state.markets.len() {
                self.state.done = true;
                info!(
                    asset_type = %P::ASSET_TYPE,
                    symbols = self.state.collected.len(),
                    "Every market swept"
                );
            }
        } else {
            self.state.cursor.advance(items);
        }

        Ok(added)
    }

    fn is_done(&self) -> bool {
        self.state.done
    }

    fn progress_summary(&self) -> String {
        let counters = &self.state.counters;
        let position = match self.state.current_market() {
            Some(market) if !self.state.done => format!(
                "market {} ({}/{}) offset {}",
                market,
                self.state.cursor.market_index + 1,
                self.state.markets.len(),
                self.state.cursor.offset
            ),
            _ if self.state.done => "done".to_string(),
            _ => "not started".to_string(),
        };
        format!(
            "{}: {} symbols from {} pages ({} duplicates, {} malformed skipped), {}",
            P::ASSET_TYPE,
            counters.symbols_collected,
            counters.pages_fetched,
            counters.duplicates_skipped,
            counters.malformed_skipped,
            position
        )
    }

    fn collected_symbols(&self) -> Vec<&Symbol> {
        self.state.collected.values().collect()
    }

    fn row_header(&self) -> Vec<String> {
        BASE_HEADERS
            .iter()
            .chain(P::extra_headers())
            .map(|h| h.to_string())
            .collect()
    }

    fn project_row(&self, symbol: &Symbol) -> Vec<Option<String>> {
        let mut row = base_cells(symbol);
        row.extend(P::extra_cells(symbol));
        row
    }

    fn cursor(&self) -> CrawlCursor {
        self.state.cursor
    }

    fn counters(&self) -> Counters {
        self.state.counters
    }

    fn snapshot(&self) -> DownloaderSnapshot {
        self.state.snapshot()
    }
}
