//! Lookup response parser
//!
//! Stateless parsing of lookup JSON bodies. Envelope problems are hard
//! errors; per-record problems are reported as plain reasons so that the
//! downloader can decide between skipping and failing (strict mode).

use serde_json::{Map, Value};

use crate::fetcher::{FetcherError, FetcherResult};
use crate::{AssetType, Symbol, SymbolDetails};

/// Decoded page envelope
#[derive(Debug, Clone, PartialEq)]
pub struct LookupPage {
    /// Raw records in upstream order
    pub items: Vec<Value>,
    /// Total number of matches reported upstream, when present
    pub total: Option<u64>,
}

/// Stateless parser for lookup responses
pub struct LookupParser;

impl LookupParser {
    /// Decode the `{"data": {"items": [...], "count": N}}` envelope
    ///
    /// # Errors
    /// Returns [`FetcherError::ParseError`] when the body is not JSON or has no
    /// `data.items` array.
    pub fn parse_page(body: &[u8]) -> FetcherResult<LookupPage> {
        let root: Value = serde_json::from_slice(body)
            .map_err(|e| FetcherError::ParseError(format!("Response is not valid JSON: {e}")))?;

        let data = root
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| FetcherError::ParseError("Missing data object".to_string()))?;

        let items = data
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError("Missing data.items array".to_string()))?
            .clone();

        let total = match data.get("count") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(other) => {
                return Err(FetcherError::ParseError(format!(
                    "Invalid data.count: {other}"
                )))
            }
        };

        Ok(LookupPage { items, total })
    }

    /// Parse one record into a [`Symbol`]
    ///
    /// `details` extracts the type-specific fields from the ticker and the
    /// record object.
    pub fn parse_record<F>(
        record: &Value,
        asset_type: AssetType,
        details: F,
    ) -> Result<Symbol, String>
    where
        F: FnOnce(&str, &Map<String, Value>) -> Result<SymbolDetails, String>,
    {
        let obj = record
            .as_object()
            .ok_or_else(|| format!("Record is not an object: {record}"))?;

        let ticker = Self::required_str(obj, "symbol")?;
        let exchange = Self::required_str(obj, "exch")
            .map_err(|e| format!("{e} (ticker {ticker})"))?;
        let details = details(&ticker, obj)?;

        let symbol = Symbol {
            name: Self::optional_str(obj, "name"),
            exchange_display: Self::optional_str(obj, "exchDisp"),
            type_display: Self::optional_str(obj, "typeDisp"),
            ticker,
            exchange,
            asset_type,
            details,
        };
        symbol.validate()?;
        Ok(symbol)
    }

    /// Required non-empty string field
    pub fn required_str(obj: &Map<String, Value>, field: &str) -> Result<String, String> {
        match obj.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::String(_)) => Err(format!("Empty {field}")),
            Some(other) => Err(format!("Invalid {field}: {other}")),
            None => Err(format!("Missing {field}")),
        }
    }

    /// Optional string field; empty strings and non-strings become `None`
    pub fn optional_str(obj: &Map<String, Value>, field: &str) -> Option<String> {
        obj.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
