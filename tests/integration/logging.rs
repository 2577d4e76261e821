//! Integration tests for logging and tracing

use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ticker_symbol_downloader::downloader::{CrawlDriver, IndexDownloader, PageOptions};
use ticker_symbol_downloader::resume::CheckpointStore;
use ticker_symbol_downloader::Market;

use crate::support::{records, FakeLookup};

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_tracing_subscriber_initialization() {
    // Either succeeds or fails because already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticker_symbol_downloader=debug")),
        )
        .with_test_writer()
        .try_init();

    info!("This is an info message");
    warn!("This is a warning message");
    error!("This is an error message");
}

#[test]
fn test_env_filter_parsing() {
    let _filter1 = EnvFilter::new("info");
    let _filter2 = EnvFilter::new("ticker_symbol_downloader=debug");
    let _filter3 = EnvFilter::new("warn,ticker_symbol_downloader::downloader=trace");
}

#[tokio::test]
async fn test_crawl_emits_structured_events() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ticker_symbol_downloader=info"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let fake = FakeLookup::new()
        .with_market("hk", records("HK", 3, "HKG"))
        .with_total()
        .shared();
    let mut downloader = IndexDownloader::new(fake, 50);
    let options = PageOptions {
        market: Market::HongKong,
        ..PageOptions::default()
    };
    CrawlDriver::new(&store, options)
        .run(&mut downloader)
        .await
        .unwrap();

    let text = captured.text();
    assert!(text.contains("Starting crawl"), "{text}");
    assert!(text.contains("Got 3 downloaded index symbols"), "{text}");
    assert!(text.contains("Market exhausted"), "{text}");
    assert!(text.contains("Checkpoint saved"), "{text}");
    assert!(text.contains("Crawl completed"), "{text}");
    // Events inside the driver carry the crawl span
    assert!(text.contains("crawl{asset_type=index}"), "{text}");
}

#[tokio::test]
async fn test_json_format_carries_fields() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("ticker_symbol_downloader=info"))
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let mut downloader = IndexDownloader::new(FakeLookup::new().shared(), 50);
    let options = PageOptions {
        market: Market::Us,
        ..PageOptions::default()
    };
    CrawlDriver::new(&store, options)
        .run(&mut downloader)
        .await
        .unwrap();

    let saved = captured
        .text()
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["fields"]["message"] == "Checkpoint saved")
        .expect("checkpoint event");
    assert_eq!(saved["fields"]["asset_type"], "index");
    assert_eq!(saved["fields"]["done"], true);
    assert_eq!(saved["fields"]["symbols"], 0);
}
