//! Lookup page request construction
//!
//! Turns a downloader's cursor position into the URL of the next page.

use url::Url;

use crate::fetcher::{FetcherError, FetcherResult};
use crate::{AssetType, Market};

/// Host serving the symbol lookup and its robots.txt
pub const LOOKUP_HOST: &str = "finance.yahoo.com";

/// Path of the symbol lookup resource
pub const LOOKUP_PATH: &str =
    "/_finance_doubledown/api/resource/finance.yfinlist.symbol_lookup";

/// Path of the robots policy
pub const ROBOTS_PATH: &str = "/robots.txt";

/// URL scheme for a request
pub fn scheme(secure: bool) -> &'static str {
    if secure {
        "https"
    } else {
        "http"
    }
}

/// Absolute URL of the lookup resource without query parameters
pub fn lookup_base_url(secure: bool) -> String {
    format!("{}://{LOOKUP_HOST}{LOOKUP_PATH}", scheme(secure))
}

/// Absolute URL of the robots policy
pub fn robots_url(secure: bool) -> String {
    format!("{}://{LOOKUP_HOST}{ROBOTS_PATH}", scheme(secure))
}

/// One page of the symbol lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Asset type being swept
    pub asset_type: AssetType,
    /// Market of the current sweep step
    pub market: Market,
    /// Offset of the first record of the page
    pub offset: u64,
    /// Maximum number of records per page
    pub page_size: u32,
    /// Use https instead of http
    pub secure: bool,
}

impl PageRequest {
    /// Create a request for `page_size` records starting at `offset`
    pub fn new(asset_type: AssetType, market: Market, offset: u64, page_size: u32) -> Self {
        Self {
            asset_type,
            market,
            offset,
            page_size,
            secure: true,
        }
    }

    /// Select the transport scheme
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Build the absolute request URL
    pub fn url(&self) -> FetcherResult<String> {
        let mut url = Url::parse(&lookup_base_url(self.secure))
            .map_err(|e| FetcherError::InvalidUrl(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("type", self.asset_type.lookup_type())
            .append_pair("market", self.market.code())
            .append_pair("start", &self.offset.to_string())
            .append_pair("count", &self.page_size.to_string())
            .append_pair("device", "console")
            .append_pair("returnMeta", "true");

        Ok(url.into())
    }
}
