//! Command line arguments

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::CliError;
use crate::downloader::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::downloader::PageOptions;
use crate::{AssetType, Market};

/// Parse and validate the throttle sleep in seconds
fn parse_sleep(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("sleep must be a non-negative number of seconds, got {s}"));
    }
    Ok(value)
}

/// Resumable ticker symbol crawler
#[derive(Debug, Clone, Parser)]
#[command(name = "ticker-symbol-downloader")]
#[command(
    about = "Download every ticker symbol of one asset type from the Yahoo Finance lookup",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Asset type to download: stocks, etf, future, index, mutualfund or currency
    #[arg(value_name = "TYPE")]
    pub asset_type: String,

    /// Use plaintext http instead of https
    #[arg(short = 'i', long, default_value_t = false)]
    pub insecure: bool,

    /// Export the checkpointed collection without downloading
    #[arg(short = 'e', long, default_value_t = false)]
    pub export: bool,

    /// Only export symbols listed on this exchange code (e.g. NYQ)
    #[arg(short = 'E', long, value_name = "CODE")]
    pub exchange: Option<String>,

    /// Seconds to sleep between requests
    #[arg(
        short = 's',
        long,
        value_name = "SECONDS",
        default_value = "0",
        value_parser = parse_sleep
    )]
    pub sleep: f64,

    /// Stop on malformed records instead of skipping them
    #[arg(short = 'p', long, visible_alias = "strict", default_value_t = false)]
    pub pandantic: bool,

    /// Market filter: all, us, dr, fr, hk or gb
    #[arg(short = 'm', long, value_name = "REGION", default_value = "all")]
    pub market: Market,

    /// Directory holding <type>.checkpoint.json and the session lock
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub checkpoint_dir: PathBuf,

    /// Directory the exports are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Records requested per page; fixed once a session has started
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64)
    )]
    pub page_size: u32,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Validated asset type
    ///
    /// Checked here rather than by clap so an unknown type exits with 1.
    pub fn asset_type(&self) -> Result<AssetType, CliError> {
        self.asset_type
            .parse::<AssetType>()
            .map_err(CliError::InvalidAssetType)
    }

    /// Sleep between pages
    pub fn throttle(&self) -> Duration {
        Duration::from_secs_f64(self.sleep)
    }

    /// Paging options for the crawl
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            secure: !self.insecure,
            strict: self.pandantic,
            market: self.market,
        }
    }
}
