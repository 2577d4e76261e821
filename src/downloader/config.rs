//! Crawl configuration constants

use std::time::Duration;

/// Save a checkpoint every N pages in addition to the completion checkpoint
pub const CHECKPOINT_INTERVAL_PAGES: u64 = 200;

/// Default number of records requested per lookup page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size the lookup endpoint honours
pub const MAX_PAGE_SIZE: u32 = 100;

/// Connect and read timeout for a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// User agent sent with every request and checked against robots.txt
pub const USER_AGENT: &str = concat!("ticker-symbol-downloader/", env!("CARGO_PKG_VERSION"));

/// Validate a requested page size
pub fn validate_page_size(page_size: u32) -> Result<u32, String> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
        ));
    }
    Ok(page_size)
}
