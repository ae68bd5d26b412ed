use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lookback windows shared by percent-change, RPD and composite scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "7d")]
    D7,
    #[serde(rename = "30d")]
    D30,
    #[serde(rename = "90d")]
    D90,
}

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::H1,
        Timeframe::H24,
        Timeframe::D7,
        Timeframe::D30,
        Timeframe::D90,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::H1 => "1h",
            Timeframe::H24 => "24h",
            Timeframe::D7 => "7d",
            Timeframe::D30 => "30d",
            Timeframe::D90 => "90d",
        }
    }

    pub fn duration_ms(&self) -> i64 {
        match self {
            Timeframe::H1 => HOUR_MS,
            Timeframe::H24 => DAY_MS,
            Timeframe::D7 => 7 * DAY_MS,
            Timeframe::D30 => 30 * DAY_MS,
            Timeframe::D90 => 90 * DAY_MS,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1h" => Ok(Timeframe::H1),
            "24h" => Ok(Timeframe::H24),
            "7d" => Ok(Timeframe::D7),
            "30d" => Ok(Timeframe::D30),
            "90d" => Ok(Timeframe::D90),
            other => Err(format!("Unknown timeframe: {}", other)),
        }
    }
}

/// Per-timeframe weights for the cross-timeframe composite.
///
/// Weights are non-negative and need not sum to 1; the scoring engine
/// normalizes by their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeWeights {
    weights: BTreeMap<Timeframe, f64>,
}

impl Default for TimeframeWeights {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Timeframe::H1, 0.05),
                (Timeframe::H24, 0.15),
                (Timeframe::D7, 0.25),
                (Timeframe::D30, 0.30),
                (Timeframe::D90, 0.25),
            ]),
        }
    }
}

impl TimeframeWeights {
    /// Build a weight table. Timeframes not listed get weight 0.
    pub fn new<I>(entries: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (Timeframe, f64)>,
    {
        let mut weights: BTreeMap<Timeframe, f64> =
            Timeframe::ALL.iter().map(|tf| (*tf, 0.0)).collect();

        for (tf, weight) in entries {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("Invalid weight for {}: {}", tf, weight));
            }
            weights.insert(tf, weight);
        }

        Ok(Self { weights })
    }

    /// Parse `1h=0.05,24h=0.15,...`. Unlisted timeframes get weight 0.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (tf, weight) = part
                .split_once('=')
                .ok_or_else(|| format!("Expected <timeframe>=<weight>, got '{}'", part))?;
            let tf: Timeframe = tf.parse()?;
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|e| format!("Invalid weight '{}': {}", weight.trim(), e))?;
            entries.push((tf, weight));
        }

        if entries.is_empty() {
            return Err("No timeframe weights given".to_string());
        }

        Self::new(entries)
    }

    pub fn get(&self, timeframe: Timeframe) -> f64 {
        self.weights.get(&timeframe).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, f64)> + '_ {
        self.weights.iter().map(|(tf, w)| (*tf, *w))
    }

    /// Same table with every weight multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Result<Self, String> {
        Self::new(self.iter().map(|(tf, w)| (tf, w * factor)))
    }
}
