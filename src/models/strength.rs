use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::timeframe::Timeframe;

/// One row of the relative strength table.
///
/// The focal asset's own row comes first with `rpd = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeStrengthRow {
    pub symbol: String,
    pub name: String,
    pub percent_change: f64,
    pub rpd: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResult {
    pub per_timeframe: BTreeMap<Timeframe, f64>,
    pub composite: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrengthRank {
    ExtremelyStrong,
    Strong,
    ModeratelyStrong,
    Neutral,
    ModeratelyWeak,
    Weak,
    ExtremelyWeak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthDescriptor {
    pub rank: StrengthRank,
    pub label: String,
    pub color: String,
}

/// Named benchmark baskets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Top10,
    Layer1,
    Defi,
    Meme,
    FxMajors,
    Custom,
}

impl Preset {
    /// Benchmark symbols of the preset; empty for `Custom`.
    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            Preset::Top10 => &["BTC", "ETH", "XRP", "SOL", "BNB", "DOGE", "ADA", "TRX", "AVAX", "LINK"],
            Preset::Layer1 => &["BTC", "ETH", "SOL", "ADA", "AVAX", "DOT", "NEAR", "ATOM"],
            Preset::Defi => &["UNI", "AAVE", "MKR", "CRV", "COMP", "SNX", "SUSHI"],
            Preset::Meme => &["DOGE", "SHIB", "PEPE", "FLOKI", "BONK", "WIF"],
            Preset::FxMajors => &["USD", "EUR", "JPY", "GBP", "AUD", "CAD", "CHF", "CNY"],
            Preset::Custom => &[],
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top10" => Ok(Preset::Top10),
            "layer1" => Ok(Preset::Layer1),
            "defi" => Ok(Preset::Defi),
            "meme" => Ok(Preset::Meme),
            "fxmajors" => Ok(Preset::FxMajors),
            "custom" => Ok(Preset::Custom),
            other => Err(format!("Unknown preset: {}", other)),
        }
    }
}

/// Query parameters for GET /api/strength/relative
#[derive(Debug, Clone, Deserialize)]
pub struct RelativeStrengthQuery {
    pub focal: Option<String>,
    pub preset: Option<String>,     // Default: top10
    pub benchmarks: Option<String>, // Comma-separated, used when preset=custom or given alone
    pub timeframe: Option<String>,  // Default: 24h
}

/// Query parameters for GET /api/strength/composite
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeQuery {
    pub focal: Option<String>,
    pub preset: Option<String>,
    pub benchmarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeStrengthResponse {
    pub focal: String,
    pub timeframe: Timeframe,
    pub rows: Vec<RelativeStrengthRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResponse {
    pub focal: String,
    pub benchmarks: Vec<String>,
    pub per_timeframe: BTreeMap<Timeframe, f64>,
    pub composite: f64,
    pub descriptor: StrengthDescriptor,
}
