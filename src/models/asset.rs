use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::timeframe::Timeframe;

/// Asset class, resolved once when the upstream payload is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Crypto,
    Fiat,
}

/// Price and per-timeframe percent changes in the quote currency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuote {
    pub price: f64,
    pub percent_change: BTreeMap<Timeframe, f64>,
}

impl AssetQuote {
    /// Percent change over `timeframe`; 0 when the upstream did not report it.
    pub fn percent_change(&self, timeframe: Timeframe) -> f64 {
        self.percent_change.get(&timeframe).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAsset {
    pub kind: AssetKind,
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub rank: i64,
    pub quote: AssetQuote,
    /// Timeframes for which no comparable history existed (fiat only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_history: Vec<Timeframe>,
}

impl MarketAsset {
    pub fn percent_change(&self, timeframe: Timeframe) -> f64 {
        self.quote.percent_change(timeframe)
    }
}

/// A batch of assets from one upstream call
#[derive(Debug, Clone, Default)]
pub struct AssetBatch {
    pub assets: Vec<MarketAsset>,
    pub last_updated: Option<String>,
}

/// Query parameters for GET /api/crypto/listings
#[derive(Debug, Clone, Deserialize)]
pub struct ListingsQuery {
    pub limit: Option<u32>,
    pub convert: Option<String>,
}

/// Query parameters for GET /api/crypto/quotes
#[derive(Debug, Clone, Deserialize)]
pub struct QuotesQuery {
    pub symbols: Option<String>, // Comma-separated: "BTC,ETH,SOL"
    pub convert: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsResponse {
    pub data: Vec<MarketAsset>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesResponse {
    pub data: HashMap<String, MarketAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}
