use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::asset::MarketAsset;

/// A point-in-time observation of exchange rates against a reference currency.
///
/// Persisted layout: `{"timestamp": <epoch ms>, "base": "USD", "rates": {"JPY": 150.0, ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Epoch milliseconds, unique within a series
    pub timestamp: i64,
    #[serde(rename = "base")]
    pub base_currency: String,
    pub rates: BTreeMap<String, f64>,
}

impl RateSnapshot {
    pub fn new(timestamp: i64, base_currency: impl Into<String>, rates: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp,
            base_currency: base_currency.into(),
            rates,
        }
    }

    /// Rate of `code` per unit of the base currency, if quoted and positive.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }
}

/// Query parameters for GET /api/fx/latest
#[derive(Debug, Clone, Deserialize)]
pub struct FxLatestQuery {
    pub symbols: Option<String>, // Comma-separated: "USD,EUR,JPY"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxLatestResponse {
    pub data: Vec<MarketAsset>,
    pub last_updated: String,
}
