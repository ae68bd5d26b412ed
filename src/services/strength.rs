//! Relative strength scoring
//!
//! Pure functions over a market universe: per-benchmark RPD, the mean RPD
//! per timeframe, and the weighted cross-timeframe composite.

use std::collections::{BTreeMap, HashSet};

use crate::models::asset::MarketAsset;
use crate::models::strength::{
    CompositeResult, RelativeStrengthRow, StrengthDescriptor, StrengthRank,
};
use crate::models::timeframe::{Timeframe, TimeframeWeights};

#[derive(Debug, Clone, PartialEq)]
pub enum StrengthError {
    UnknownSymbol(String),
}

impl std::fmt::Display for StrengthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrengthError::UnknownSymbol(symbol) => write!(f, "Unknown asset symbol: {}", symbol),
        }
    }
}

impl std::error::Error for StrengthError {}

/// Relative performance difference. Positive means the focal asset
/// outperformed the benchmark.
pub fn rpd(focal_change: f64, benchmark_change: f64) -> f64 {
    focal_change - benchmark_change
}

/// Mean RPD of the focal asset against every benchmark; 0 for an empty basket.
pub fn timeframe_composite(focal_change: f64, benchmark_changes: &[f64]) -> f64 {
    if benchmark_changes.is_empty() {
        return 0.0;
    }

    let sum: f64 = benchmark_changes
        .iter()
        .map(|change| rpd(focal_change, *change))
        .sum();

    sum / benchmark_changes.len() as f64
}

/// `Σ(score × weight) / Σ(weight)`; 0 when the weights sum to zero.
///
/// Timeframes missing from `per_timeframe` count as a score of 0.
pub fn weighted_composite(per_timeframe: &BTreeMap<Timeframe, f64>, weights: &TimeframeWeights) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;

    for (timeframe, weight) in weights.iter() {
        let score = per_timeframe.get(&timeframe).copied().unwrap_or(0.0);
        total += score * weight;
        weight_sum += weight;
    }

    if weight_sum == 0.0 { 0.0 } else { total / weight_sum }
}

pub fn strength_descriptor(score: f64) -> StrengthDescriptor {
    let (rank, label, color) = if score >= 20.0 {
        (StrengthRank::ExtremelyStrong, "Extremely strong", "#ef4444")
    } else if score >= 10.0 {
        (StrengthRank::Strong, "Strong", "#f97316")
    } else if score >= 3.0 {
        (StrengthRank::ModeratelyStrong, "Moderately strong", "#10b981")
    } else if score <= -20.0 {
        (StrengthRank::ExtremelyWeak, "Extremely weak", "#7c3aed")
    } else if score <= -10.0 {
        (StrengthRank::Weak, "Weak", "#3b82f6")
    } else if score <= -3.0 {
        (StrengthRank::ModeratelyWeak, "Moderately weak", "#38bdf8")
    } else {
        (StrengthRank::Neutral, "Neutral", "#64748b")
    };

    StrengthDescriptor {
        rank,
        label: label.to_string(),
        color: color.to_string(),
    }
}

/// Focal asset and its resolved benchmark basket
#[derive(Debug)]
pub struct Selection<'a> {
    pub focal: &'a MarketAsset,
    pub benchmarks: Vec<&'a MarketAsset>,
}

/// Resolve symbols against the universe.
///
/// Benchmarks missing from the universe are skipped, as are duplicates and
/// the focal asset itself. An unknown focal symbol is an error.
pub fn select<'a>(
    universe: &'a [MarketAsset],
    focal_symbol: &str,
    benchmark_symbols: &[String],
) -> Result<Selection<'a>, StrengthError> {
    let find = |symbol: &str| universe.iter().find(|a| a.symbol.eq_ignore_ascii_case(symbol));

    let focal = find(focal_symbol)
        .ok_or_else(|| StrengthError::UnknownSymbol(focal_symbol.to_string()))?;

    let mut seen = HashSet::new();
    let mut benchmarks = Vec::new();
    for symbol in benchmark_symbols {
        let Some(asset) = find(symbol) else {
            tracing::debug!("Benchmark {} not in market universe, skipping", symbol);
            continue;
        };
        if asset.symbol == focal.symbol || !seen.insert(asset.symbol.as_str()) {
            continue;
        }
        benchmarks.push(asset);
    }

    Ok(Selection { focal, benchmarks })
}

/// Relative strength table for one timeframe: the focal row (rpd 0)
/// followed by one row per benchmark in basket order.
pub fn compute_relative_strength(
    universe: &[MarketAsset],
    focal_symbol: &str,
    benchmark_symbols: &[String],
    timeframe: Timeframe,
) -> Result<Vec<RelativeStrengthRow>, StrengthError> {
    let selection = select(universe, focal_symbol, benchmark_symbols)?;
    let focal_change = selection.focal.percent_change(timeframe);

    let mut rows = Vec::with_capacity(selection.benchmarks.len() + 1);
    rows.push(RelativeStrengthRow {
        symbol: selection.focal.symbol.clone(),
        name: selection.focal.name.clone(),
        percent_change: focal_change,
        rpd: 0.0,
        price: selection.focal.quote.price,
    });

    for benchmark in &selection.benchmarks {
        let change = benchmark.percent_change(timeframe);
        rows.push(RelativeStrengthRow {
            symbol: benchmark.symbol.clone(),
            name: benchmark.name.clone(),
            percent_change: change,
            rpd: rpd(focal_change, change),
            price: benchmark.quote.price,
        });
    }

    Ok(rows)
}

/// Per-timeframe mean RPD and their weighted composite
pub fn compute_composite(
    universe: &[MarketAsset],
    focal_symbol: &str,
    benchmark_symbols: &[String],
    weights: &TimeframeWeights,
) -> Result<CompositeResult, StrengthError> {
    let selection = select(universe, focal_symbol, benchmark_symbols)?;
    Ok(composite_for(&selection, weights))
}

pub fn composite_for(selection: &Selection<'_>, weights: &TimeframeWeights) -> CompositeResult {
    let per_timeframe: BTreeMap<Timeframe, f64> = Timeframe::ALL
        .iter()
        .map(|tf| {
            let changes: Vec<f64> = selection
                .benchmarks
                .iter()
                .map(|b| b.percent_change(*tf))
                .collect();
            (*tf, timeframe_composite(selection.focal.percent_change(*tf), &changes))
        })
        .collect();

    let composite = weighted_composite(&per_timeframe, weights);

    CompositeResult {
        per_timeframe,
        composite,
    }
}
