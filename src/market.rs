//! Market filters and sweep planning
//!
//! The lookup endpoint partitions regional instruments by market. A sweep plan
//! is the ordered list of markets one downloader walks through.

use crate::AssetType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regional market filter accepted by the lookup endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Market {
    /// No regional restriction
    #[default]
    #[serde(rename = "all")]
    All,
    /// USA and Canada
    #[serde(rename = "us")]
    Us,
    /// Germany
    #[serde(rename = "dr")]
    Germany,
    /// France
    #[serde(rename = "fr")]
    France,
    /// Hong Kong
    #[serde(rename = "hk")]
    HongKong,
    /// United Kingdom
    #[serde(rename = "gb")]
    UnitedKingdom,
}

impl Market {
    /// Query value for the `market` parameter
    pub fn code(&self) -> &'static str {
        match self {
            Market::All => "all",
            Market::Us => "us",
            Market::Germany => "dr",
            Market::France => "fr",
            Market::HongKong => "hk",
            Market::UnitedKingdom => "gb",
        }
    }

    /// Ordered markets to sweep for `asset_type` under this filter
    ///
    /// `all` is a single unrestricted sweep covering every exchange. Global
    /// asset types ignore the filter.
    pub fn sweep_plan(&self, asset_type: AssetType) -> Vec<Market> {
        if asset_type.is_regional() {
            vec![*self]
        } else {
            vec![Market::All]
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Market::All),
            "us" => Ok(Market::Us),
            "dr" => Ok(Market::Germany),
            "fr" => Ok(Market::France),
            "hk" => Ok(Market::HongKong),
            "gb" => Ok(Market::UnitedKingdom),
            other => Err(format!(
                "Invalid market: {other}. Valid options: all, us, dr, fr, hk, gb"
            )),
        }
    }
}
