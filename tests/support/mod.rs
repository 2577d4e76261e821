//! In-memory lookup service used instead of the live network

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use ticker_symbol_downloader::fetcher::{Fetch, FetcherError, FetcherResult};
use ticker_symbol_downloader::shutdown::SharedShutdown;
use url::Url;

/// Scripted lookup endpoint
///
/// Serves the records registered per market code, sliced by the `start` and
/// `count` query parameters, and answers `/robots.txt` with a configurable
/// body (404 when none is set).
#[derive(Default)]
pub struct FakeLookup {
    markets: HashMap<String, Vec<Value>>,
    report_total: bool,
    robots: Option<String>,
    fail_on_page_call: Mutex<Option<usize>>,
    shutdown_after: Mutex<Option<(usize, SharedShutdown)>>,
    page_calls: AtomicUsize,
    robots_calls: AtomicUsize,
    requests: Mutex<Vec<(String, u64)>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the records of one market
    pub fn with_market(mut self, market: &str, items: Vec<Value>) -> Self {
        self.markets.insert(market.to_string(), items);
        self
    }

    /// Report the total match count in every page envelope
    pub fn with_total(mut self) -> Self {
        self.report_total = true;
        self
    }

    /// Serve this robots.txt body
    pub fn with_robots(mut self, body: &str) -> Self {
        self.robots = Some(body.to_string());
        self
    }

    /// Fail the page request with this zero-based index once
    pub fn fail_on_page_call(self, call: usize) -> Self {
        *self.fail_on_page_call.lock().unwrap() = Some(call);
        self
    }

    /// Request shutdown once this many pages have been served
    pub fn shutdown_after(self, pages: usize, shutdown: SharedShutdown) -> Self {
        *self.shutdown_after.lock().unwrap() = Some((pages, shutdown));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn robots_calls(&self) -> usize {
        self.robots_calls.load(Ordering::SeqCst)
    }

    /// (market, start) of every page request in order
    pub fn requests(&self) -> Vec<(String, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for FakeLookup {
    async fn fetch(&self, url: &str, _user_agent: &str) -> FetcherResult<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| FetcherError::InvalidUrl(e.to_string()))?;

        if parsed.path() == "/robots.txt" {
            self.robots_calls.fetch_add(1, Ordering::SeqCst);
            return match &self.robots {
                Some(body) => Ok(body.clone().into_bytes()),
                None => Err(FetcherError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                }),
            };
        }

        let call = self.page_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut fail = self.fail_on_page_call.lock().unwrap();
            if *fail == Some(call) {
                *fail = None;
                return Err(FetcherError::NetworkError("connection reset by peer".to_string()));
            }
        }

        let query: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
        let market = query.get("market").cloned().unwrap_or_default();
        let start: usize = query.get("start").and_then(|s| s.parse().ok()).unwrap_or(0);
        let count: usize = query.get("count").and_then(|s| s.parse().ok()).unwrap_or(50);
        self.requests.lock().unwrap().push((market.clone(), start as u64));

        let all = self.markets.get(&market).cloned().unwrap_or_default();
        let items: Vec<Value> = all.iter().skip(start).take(count).cloned().collect();
        let body = if self.report_total {
            json!({"data": {"items": items, "count": all.len()}})
        } else {
            json!({"data": {"items": items}})
        };

        if let Some((after, shutdown)) = self.shutdown_after.lock().unwrap().as_ref() {
            if call + 1 >= *after {
                shutdown.request();
            }
        }

        Ok(body.to_string().into_bytes())
    }
}

/// `n` well-formed records named `<prefix><i>` on `exchange`
pub fn records(prefix: &str, n: usize, exchange: &str) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "symbol": format!("{prefix}{i}"),
                "name": format!("{prefix} company {i}"),
                "exch": exchange,
                "exchDisp": exchange,
                "type": "S",
                "typeDisp": "Equity",
            })
        })
        .collect()
}
