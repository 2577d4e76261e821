//! Export of a collected symbol set

use serde_json::{json, Value};
use tempfile::TempDir;
use ticker_symbol_downloader::downloader::{
    AssetDownloader, CurrencyDownloader, MutualFundDownloader, PageOptions, StockDownloader,
};
use ticker_symbol_downloader::output::{Exporter, Table};
use ticker_symbol_downloader::{AssetType, Market};

use crate::support::FakeLookup;

/// Ten stocks, three of them on NYQ at positions 1, 4 and 8
fn mixed_exchanges() -> Vec<Value> {
    (0..10)
        .map(|i| {
            let exchange = if [1, 4, 8].contains(&i) { "NYQ" } else { "NMS" };
            json!({
                "symbol": format!("T{i}"),
                "name": format!("Company {i}"),
                "exch": exchange,
                "exchDisp": if exchange == "NYQ" { "NYSE" } else { "NASDAQ" },
                "typeDisp": "Equity",
            })
        })
        .collect()
}

async fn collected_stocks() -> StockDownloader {
    let fake = FakeLookup::new()
        .with_market("us", mixed_exchanges())
        .with_total()
        .shared();
    let mut downloader = StockDownloader::new(fake, 50);
    let options = PageOptions {
        market: Market::Us,
        ..PageOptions::default()
    };
    downloader.next_page(&options).await.unwrap();
    assert!(downloader.is_done());
    downloader
}

#[tokio::test]
async fn test_exchange_filter_keeps_discovery_order() {
    let downloader = collected_stocks().await;

    let table = Table::from_downloader(&downloader, Some("NYQ"));

    assert_eq!(table.len(), 3);
    let tickers: Vec<_> = table
        .rows()
        .iter()
        .map(|row| row[0].clone().unwrap())
        .collect();
    assert_eq!(tickers, vec!["T1", "T4", "T8"]);
}

#[tokio::test]
async fn test_exchange_filter_is_exact() {
    let downloader = collected_stocks().await;

    assert!(Table::from_downloader(&downloader, Some("nyq")).is_empty());
    assert!(Table::from_downloader(&downloader, Some("NY")).is_empty());
    assert_eq!(Table::from_downloader(&downloader, None).len(), 10);
}

#[tokio::test]
async fn test_csv_export_contents() {
    let dir = TempDir::new().unwrap();
    let downloader = collected_stocks().await;
    let table = Table::from_downloader(&downloader, Some("NYQ"));

    let report = Exporter::new(dir.path())
        .export(AssetType::Stocks, &table)
        .unwrap();
    assert_eq!(report.rows, 3);
    assert!(report.failed.is_empty());
    assert_eq!(report.written[0], dir.path().join("stocks.csv"));

    let content = std::fs::read_to_string(dir.path().join("stocks.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "Ticker,Name,Exchange,Exchange Display,Type,Type Display"
    );
    assert_eq!(lines[1], "T1,Company 1,NYQ,NYSE,equity,Equity");
}

#[tokio::test]
async fn test_json_and_yaml_exports_match_csv_rows() {
    let dir = TempDir::new().unwrap();
    let downloader = collected_stocks().await;
    let table = Table::from_downloader(&downloader, None);
    Exporter::new(dir.path())
        .export(AssetType::Stocks, &table)
        .unwrap();

    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stocks.json")).unwrap())
            .unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[4]["Ticker"], "T4");
    assert_eq!(rows[4]["Exchange Display"], "NYSE");

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(dir.path().join("stocks.yaml")).unwrap())
            .unwrap();
    let rows = yaml.as_sequence().unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[9]["Ticker"].as_str(), Some("T9"));
}

#[tokio::test]
async fn test_spreadsheet_is_written_alongside_csv() {
    let dir = TempDir::new().unwrap();
    let downloader = collected_stocks().await;
    let table = Table::from_downloader(&downloader, Some("NYQ"));

    let report = Exporter::new(dir.path())
        .export(AssetType::Stocks, &table)
        .unwrap();

    let xlsx = dir.path().join("stocks.xlsx");
    assert!(report.written.contains(&xlsx));
    let bytes = std::fs::read(&xlsx).unwrap();
    assert_eq!(&bytes[..4], b"PK\x03\x04");
}

#[tokio::test]
async fn test_type_specific_columns() {
    let fake = FakeLookup::new()
        .with_market(
            "all",
            vec![
                json!({"symbol": "EURUSD=X", "exch": "CCY", "name": "EUR/USD"}),
                json!({"symbol": "JPY=X", "exch": "CCY"}),
            ],
        )
        .shared();
    let mut currencies = CurrencyDownloader::new(fake, 50);
    currencies.next_page(&PageOptions::default()).await.unwrap();

    let table = Table::from_downloader(&currencies, None);
    assert_eq!(&table.header()[6..], &["Base".to_string(), "Quote".to_string()]);
    assert_eq!(
        table.rows()[1],
        vec![
            Some("JPY=X".to_string()),
            None,
            Some("CCY".to_string()),
            None,
            Some("currency".to_string()),
            None,
            Some("USD".to_string()),
            Some("JPY".to_string()),
        ]
    );

    let fake = FakeLookup::new()
        .with_market(
            "us",
            vec![json!({"symbol": "VFIAX", "exch": "NAS", "fundFamily": "Vanguard"})],
        )
        .shared();
    let mut funds = MutualFundDownloader::new(fake, 50);
    funds
        .next_page(&PageOptions {
            market: Market::Us,
            ..PageOptions::default()
        })
        .await
        .unwrap();

    let table = Table::from_downloader(&funds, None);
    assert_eq!(
        &table.header()[6..],
        &["Category".to_string(), "Fund Family".to_string()]
    );
    assert_eq!(table.rows()[0][6], None);
    assert_eq!(table.rows()[0][7].as_deref(), Some("Vanguard"));

    let dir = TempDir::new().unwrap();
    Exporter::new(dir.path())
        .export(AssetType::MutualFund, &table)
        .unwrap();
    let csv = std::fs::read_to_string(dir.path().join("mutualfund.csv")).unwrap();
    assert!(csv.lines().nth(1).unwrap().ends_with(",,Vanguard"));
}

#[tokio::test]
async fn test_empty_collection_exports_header_only() {
    let dir = TempDir::new().unwrap();
    let downloader = StockDownloader::new(FakeLookup::new().shared(), 50);
    let table = Table::from_downloader(&downloader, None);

    let report = Exporter::new(dir.path())
        .export(AssetType::Stocks, &table)
        .unwrap();

    assert_eq!(report.rows, 0);
    let content = std::fs::read_to_string(dir.path().join("stocks.csv")).unwrap();
    assert_eq!(content.lines().count(), 1);
    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stocks.json")).unwrap())
            .unwrap();
    assert_eq!(json, json!([]));
}
