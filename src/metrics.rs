//! Crawl metrics
//!
//! Counters for pages, symbols, skipped records, checkpoints and finished
//! crawls. Recording is always cheap; nothing is exported unless
//! [`init_metrics`] installs the Prometheus scrape endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::AssetType;

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Install the Prometheus exporter on `addr`
///
/// Idempotent; later calls are no-ops.
pub async fn init_metrics(
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!(%addr, "Initializing metrics exporter");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "lookup_pages_fetched_total",
        Unit::Count,
        "Lookup pages fetched and committed"
    );
    describe_counter!(
        "lookup_symbols_collected_total",
        Unit::Count,
        "New unique symbols collected"
    );
    describe_counter!(
        "lookup_records_skipped_total",
        Unit::Count,
        "Malformed records skipped in relaxed mode"
    );
    describe_counter!(
        "checkpoints_saved_total",
        Unit::Count,
        "Checkpoints written, by reason"
    );
    describe_counter!(
        "crawls_finished_total",
        Unit::Count,
        "Crawl runs finished, by outcome"
    );
    describe_histogram!(
        "crawl_duration_seconds",
        Unit::Seconds,
        "Wall time of one crawl run"
    );

    *initialized = true;
    Ok(())
}

/// Check if the exporter is installed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Record one committed page
pub fn record_page(new_symbols: u64, skipped: u64) {
    counter!("lookup_pages_fetched_total").increment(1);
    counter!("lookup_symbols_collected_total").increment(new_symbols);
    if skipped > 0 {
        counter!("lookup_records_skipped_total").increment(skipped);
    }
}

/// Record one checkpoint write
pub fn record_checkpoint(reason: &'static str) {
    counter!("checkpoints_saved_total", "reason" => reason).increment(1);
}

/// Metrics of one crawl run
pub struct CrawlMetrics {
    asset_type: AssetType,
    start_time: Instant,
}

impl CrawlMetrics {
    /// Start timing a crawl
    pub fn start(asset_type: AssetType) -> Self {
        Self {
            asset_type,
            start_time: Instant::now(),
        }
    }

    /// Record how the crawl ended
    pub fn record_finished(&self, outcome: &'static str) {
        let asset_type = self.asset_type.key();
        counter!(
            "crawls_finished_total",
            "asset_type" => asset_type,
            "outcome" => outcome
        )
        .increment(1);
        histogram!("crawl_duration_seconds", "asset_type" => asset_type)
            .record(self.start_time.elapsed().as_secs_f64());
    }
}
