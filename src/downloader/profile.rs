//! Per-asset-type behaviour
//!
//! Asset types share one pagination state machine and differ only in how a
//! record's type-specific fields are parsed, which response shape marks the
//! end of a market, and which extra columns they export.

use serde_json::{Map, Value};

use crate::fetcher::LookupParser;
use crate::{AssetType, Symbol, SymbolDetails};

/// Columns exported for every asset type
pub const BASE_HEADERS: [&str; 6] = [
    "Ticker",
    "Name",
    "Exchange",
    "Exchange Display",
    "Type",
    "Type Display",
];

/// Response shape that marks a market as exhausted, in addition to an empty
/// page or a page without new symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// Only an empty (or fully duplicate) page ends the market
    EmptyPage,
    /// A page shorter than the requested page size ends the market
    ShortPage,
    /// Reaching the reported total match count ends the market
    TotalCount,
}

/// Asset-type specific hooks used by [`super::LookupDownloader`]
pub trait AssetProfile: Send + Sync + 'static {
    /// Asset type this profile describes
    const ASSET_TYPE: AssetType;

    /// Exhaustion rule for one market
    const EXHAUSTION: Exhaustion;

    /// Parse type-specific fields of a record
    fn details(_ticker: &str, _record: &Map<String, Value>) -> Result<SymbolDetails, String> {
        Ok(SymbolDetails::None)
    }

    /// Extra export columns after [`BASE_HEADERS`]
    fn extra_headers() -> &'static [&'static str] {
        &[]
    }

    /// Extra export cells, aligned with [`AssetProfile::extra_headers`]
    fn extra_cells(_symbol: &Symbol) -> Vec<Option<String>> {
        Vec::new()
    }
}

/// Cells for [`BASE_HEADERS`]
pub fn base_cells(symbol: &Symbol) -> Vec<Option<String>> {
    vec![
        Some(symbol.ticker.clone()),
        symbol.name.clone(),
        Some(symbol.exchange.clone()),
        symbol.exchange_display.clone(),
        Some(symbol.asset_type.lookup_type().to_string()),
        symbol.type_display.clone(),
    ]
}

/// Stocks
#[derive(Debug, Clone, Copy, Default)]
pub struct Stocks;

impl AssetProfile for Stocks {
    const ASSET_TYPE: AssetType = AssetType::Stocks;
    const EXHAUSTION: Exhaustion = Exhaustion::TotalCount;
}

/// Exchange traded funds
#[derive(Debug, Clone, Copy, Default)]
pub struct Etfs;

impl AssetProfile for Etfs {
    const ASSET_TYPE: AssetType = AssetType::Etf;
    const EXHAUSTION: Exhaustion = Exhaustion::TotalCount;
}

/// Market indices
#[derive(Debug, Clone, Copy, Default)]
pub struct Indices;

impl AssetProfile for Indices {
    const ASSET_TYPE: AssetType = AssetType::Index;
    const EXHAUSTION: Exhaustion = Exhaustion::TotalCount;
}

/// Futures; the lookup reports no usable total for them
#[derive(Debug, Clone, Copy, Default)]
pub struct Futures;

impl AssetProfile for Futures {
    const ASSET_TYPE: AssetType = AssetType::Future;
    const EXHAUSTION: Exhaustion = Exhaustion::ShortPage;

    fn details(_ticker: &str, record: &Map<String, Value>) -> Result<SymbolDetails, String> {
        Ok(SymbolDetails::Future {
            underlying: LookupParser::optional_str(record, "underlyingSymbol"),
        })
    }

    fn extra_headers() -> &'static [&'static str] {
        &["Underlying"]
    }

    fn extra_cells(symbol: &Symbol) -> Vec<Option<String>> {
        match &symbol.details {
            SymbolDetails::Future { underlying } => vec![underlying.clone()],
            _ => vec![None],
        }
    }
}

/// Mutual funds
#[derive(Debug, Clone, Copy, Default)]
pub struct MutualFunds;

impl AssetProfile for MutualFunds {
    const ASSET_TYPE: AssetType = AssetType::MutualFund;
    const EXHAUSTION: Exhaustion = Exhaustion::TotalCount;

    fn details(_ticker: &str, record: &Map<String, Value>) -> Result<SymbolDetails, String> {
        Ok(SymbolDetails::MutualFund {
            category: LookupParser::optional_str(record, "category"),
            fund_family: LookupParser::optional_str(record, "fundFamily"),
        })
    }

    fn extra_headers() -> &'static [&'static str] {
        &["Category", "Fund Family"]
    }

    fn extra_cells(symbol: &Symbol) -> Vec<Option<String>> {
        match &symbol.details {
            SymbolDetails::MutualFund {
                category,
                fund_family,
            } => vec![category.clone(), fund_family.clone()],
            _ => vec![None, None],
        }
    }
}

/// Currency pairs; the whole list is paged without a total
#[derive(Debug, Clone, Copy, Default)]
pub struct Currencies;

impl Currencies {
    /// Split a currency ticker into its legs
    ///
    /// `EURUSD=X` is EUR/USD; the short form `JPY=X` is quoted against USD.
    pub fn legs(ticker: &str) -> Result<(String, String), String> {
        let pair = ticker
            .strip_suffix("=X")
            .ok_or_else(|| format!("Currency ticker {ticker} lacks the =X suffix"))?;

        if !pair.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("Currency ticker {ticker} has non-letter legs"));
        }

        match pair.len() {
            3 => Ok(("USD".to_string(), pair.to_ascii_uppercase())),
            6 => Ok((
                pair[..3].to_ascii_uppercase(),
                pair[3..].to_ascii_uppercase(),
            )),
            _ => Err(format!("Currency ticker {ticker} is not a pair")),
        }
    }
}

impl AssetProfile for Currencies {
    const ASSET_TYPE: AssetType = AssetType::Currency;
    const EXHAUSTION: Exhaustion = Exhaustion::EmptyPage;

    fn details(ticker: &str, _record: &Map<String, Value>) -> Result<SymbolDetails, String> {
        let (base, quote) = Self::legs(ticker)?;
        Ok(SymbolDetails::Currency { base, quote })
    }

    fn extra_headers() -> &'static [&'static str] {
        &["Base", "Quote"]
    }

    fn extra_cells(symbol: &Symbol) -> Vec<Option<String>> {
        match &symbol.details {
            SymbolDetails::Currency { base, quote } => {
                vec![Some(base.clone()), Some(quote.clone())]
            }
            _ => vec![None, None],
        }
    }
}
