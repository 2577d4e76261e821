//! Integration tests for checkpoint save, load and resume

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use ticker_symbol_downloader::downloader::{
    AssetDownloader, CrawlCursor, CrawlDriver, CrawlOutcome, PageOptions,
};
use ticker_symbol_downloader::registry::DownloaderRegistry;
use ticker_symbol_downloader::resume::{CheckpointStore, ResumeError, SessionLock, SCHEMA_VERSION};
use ticker_symbol_downloader::shutdown::ShutdownSignal;
use ticker_symbol_downloader::{AssetType, Market, SymbolDetails};

use crate::support::{records, FakeLookup};

fn items_for(asset_type: AssetType) -> Vec<Value> {
    match asset_type {
        AssetType::Currency => vec![
            json!({"symbol": "EURUSD=X", "exch": "CCY", "name": "EUR/USD"}),
            json!({"symbol": "GBPUSD=X", "exch": "CCY", "name": "GBP/USD"}),
            json!({"symbol": "JPY=X", "exch": "CCY", "name": "USD/JPY"}),
        ],
        AssetType::MutualFund => (0..3)
            .map(|i| {
                json!({
                    "symbol": format!("FUND{i}X"),
                    "exch": "NAS",
                    "category": "Large Growth",
                    "fundFamily": "Vanguard",
                })
            })
            .collect(),
        AssetType::Future => (0..3)
            .map(|i| {
                json!({"symbol": format!("ES{i}=F"), "exch": "CME", "underlyingSymbol": "ES=F"})
            })
            .collect(),
        _ => records("T", 3, "NYQ"),
    }
}

fn us_only() -> PageOptions {
    PageOptions {
        market: Market::Us,
        ..PageOptions::default()
    }
}

#[tokio::test]
async fn test_every_asset_type_resumes_to_identical_state() {
    let registry = DownloaderRegistry::standard();

    for asset_type in AssetType::ALL {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());
        let fake = FakeLookup::new()
            .with_market("us", items_for(asset_type))
            .with_market("all", items_for(asset_type))
            .shared();

        let mut downloader = registry.create(asset_type, fake.clone(), 2).unwrap();
        downloader.next_page(&us_only()).await.unwrap();
        store.save(downloader.as_ref()).unwrap();

        let restored = store.restore(&registry, asset_type, fake.clone()).unwrap();

        assert_eq!(restored.asset_type(), asset_type);
        assert_eq!(restored.snapshot(), downloader.snapshot(), "{asset_type}");
        assert_eq!(restored.progress_summary(), downloader.progress_summary());
        assert_eq!(restored.cursor(), CrawlCursor { market_index: 0, offset: 2 });
        assert_eq!(restored.row_header(), downloader.row_header());
    }
}

#[tokio::test]
async fn test_type_specific_details_survive_a_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();
    let fake = FakeLookup::new()
        .with_market("all", items_for(AssetType::Currency))
        .shared();

    let mut downloader = registry.create(AssetType::Currency, fake.clone(), 50).unwrap();
    downloader.next_page(&PageOptions::default()).await.unwrap();
    store.save(downloader.as_ref()).unwrap();

    let restored = store
        .restore(&registry, AssetType::Currency, fake.clone())
        .unwrap();
    let yen = restored
        .collected_symbols()
        .into_iter()
        .find(|s| s.ticker == "JPY=X")
        .cloned()
        .unwrap();
    assert_eq!(
        yen.details,
        SymbolDetails::Currency {
            base: "USD".to_string(),
            quote: "JPY".to_string()
        }
    );
}

#[tokio::test]
async fn test_resume_after_interrupt_collects_no_duplicates() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();
    let shutdown = ShutdownSignal::shared();
    let fake = FakeLookup::new()
        .with_market("us", records("S", 400, "NYQ"))
        .with_total()
        .shutdown_after(2, shutdown.clone())
        .shared();

    let mut first = registry.create(AssetType::Stocks, fake.clone(), 50).unwrap();
    let report = CrawlDriver::new(&store, us_only())
        .with_shutdown(shutdown)
        .run(first.as_mut())
        .await
        .unwrap();
    assert_eq!(report.outcome, CrawlOutcome::Interrupted);
    drop(first);

    // Second session with a fresh fetcher and no shutdown hook
    let fake = FakeLookup::new()
        .with_market("us", records("S", 400, "NYQ"))
        .with_total()
        .shared();
    let mut resumed = store
        .restore(&registry, AssetType::Stocks, fake.clone())
        .unwrap();
    assert_eq!(resumed.cursor().offset, 100);

    let report = CrawlDriver::new(&store, us_only())
        .run(resumed.as_mut())
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.symbols_added, 300);
    assert_eq!(resumed.collected_symbols().len(), 400);
    assert_eq!(resumed.counters().duplicates_skipped, 0);
    assert_eq!(resumed.counters().pages_fetched, 8);
    assert_eq!(fake.requests().first(), Some(&("us".to_string(), 100)));
}

#[tokio::test]
async fn test_overlapping_pages_after_resume_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();

    let fake = FakeLookup::new()
        .with_market("us", records("S", 60, "NYQ"))
        .shared();
    let mut downloader = registry.create(AssetType::Etf, fake.clone(), 50).unwrap();
    downloader.next_page(&us_only()).await.unwrap();
    store.save(downloader.as_ref()).unwrap();

    // Upstream shifted by ten: the next page repeats forty known symbols
    let mut shifted = records("S", 40, "NYQ");
    shifted.extend(records("S", 60, "NYQ"));
    let fake = FakeLookup::new().with_market("us", shifted).shared();
    let mut resumed = store.restore(&registry, AssetType::Etf, fake).unwrap();
    let added = resumed.next_page(&us_only()).await.unwrap();

    assert_eq!(added.len(), 10);
    assert_eq!(resumed.counters().duplicates_skipped, 40);
    assert_eq!(resumed.collected_symbols().len(), 60);
}

#[test]
fn test_missing_checkpoint_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();

    let err = store
        .restore(&registry, AssetType::Index, Arc::new(FakeLookup::new()))
        .err()
        .unwrap();
    assert!(err.is_not_found());
}

#[test]
fn test_corrupt_checkpoint_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let truncated = b"{\"schema_version\": \"1.0.0\", \"sta";
    std::fs::write(store.path(AssetType::Stocks), truncated).unwrap();

    let err = store.load(AssetType::Stocks).unwrap_err();
    assert!(matches!(err, ResumeError::Corrupt(_)), "{err:?}");
}

#[test]
fn test_checkpoint_with_wrong_shape_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let body = json!({"schema_version": SCHEMA_VERSION, "asset_type": "stocks", "state": 42});
    std::fs::write(store.path(AssetType::Stocks), body.to_string()).unwrap();

    let err = store.load(AssetType::Stocks).unwrap_err();
    assert!(matches!(err, ResumeError::Corrupt(_)), "{err:?}");
}

#[test]
fn test_future_schema_version_is_a_mismatch() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let body = json!({"schema_version": "2.0.0", "layout": "something new"});
    std::fs::write(store.path(AssetType::Etf), body.to_string()).unwrap();

    match store.load(AssetType::Etf) {
        Err(ResumeError::SchemaVersionMismatch { expected, found }) => {
            assert_eq!(expected, SCHEMA_VERSION);
            assert_eq!(found, "2.0.0");
        }
        other => panic!("expected a version mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_inconsistent_snapshot_is_refused() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();
    let fake = FakeLookup::new()
        .with_market("us", records("S", 100, "NYQ"))
        .shared();

    let mut downloader = registry.create(AssetType::Stocks, fake.clone(), 50).unwrap();
    downloader.next_page(&us_only()).await.unwrap();
    let path = store.save(downloader.as_ref()).unwrap();

    // Point the cursor past the end of a single market sweep
    let mut raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    raw["state"]["cursor"]["market_index"] = json!(7);
    std::fs::write(&path, raw.to_string()).unwrap();

    let err = store
        .restore(&registry, AssetType::Stocks, fake.clone())
        .err()
        .unwrap();
    assert!(matches!(err, ResumeError::Corrupt(_)), "{err:?}");
}

#[test]
fn test_checkpoint_of_another_type_is_refused() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();

    let downloader = registry
        .create(AssetType::Index, Arc::new(FakeLookup::new()), 50)
        .unwrap();
    let index_path = store.save(downloader.as_ref()).unwrap();
    std::fs::copy(&index_path, store.path(AssetType::Etf)).unwrap();

    let err = store.load(AssetType::Etf).unwrap_err();
    assert!(matches!(err, ResumeError::Corrupt(_)), "{err:?}");
}

#[test]
fn test_save_replaces_previous_checkpoint_atomically() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let registry = DownloaderRegistry::standard();

    let downloader = registry
        .create(AssetType::Future, Arc::new(FakeLookup::new()), 50)
        .unwrap();
    store.save(downloader.as_ref()).unwrap();
    store.save(downloader.as_ref()).unwrap();

    // Only the checkpoint itself remains; no temp files are left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["future.checkpoint.json".to_string()]);
}

#[test]
fn test_concurrent_session_fails_fast() {
    let dir = TempDir::new().unwrap();

    let held = SessionLock::try_acquire(dir.path(), AssetType::Stocks).unwrap();
    let err = SessionLock::try_acquire(dir.path(), AssetType::Stocks)
        .err()
        .unwrap();
    assert!(matches!(err, ResumeError::Lock(_)));

    drop(held);
    assert!(SessionLock::try_acquire(dir.path(), AssetType::Stocks).is_ok());
}
