use std::collections::BTreeMap;

use crate::models::fx::RateSnapshot;
use crate::models::timeframe::Timeframe;
use crate::services::snapshot_series::SnapshotSeries;

/// Percent change from `past_rate` to `now_rate`.
///
/// No comparable history (`None` or a zero past rate) yields 0 so that
/// NaN/Infinity never reach the scoring pipeline.
pub fn percent_change(now_rate: f64, past_rate: Option<f64>) -> f64 {
    match past_rate {
        Some(past) if past != 0.0 && past.is_finite() => ((now_rate - past) / past) * 100.0,
        _ => 0.0,
    }
}

/// Price of one unit of `symbol` in `quote`, derived from a snapshot whose
/// rates are expressed per unit of its base (reference) currency.
pub fn cross_rate(snapshot: &RateSnapshot, symbol: &str, quote: &str) -> Option<f64> {
    let base = snapshot.base_currency.as_str();

    let quote_per_base = if quote == base {
        1.0
    } else {
        snapshot.rate(quote)?
    };

    if symbol == quote {
        return Some(1.0);
    }

    // The base currency is not a key of its own rate table
    if symbol == base {
        return Some(quote_per_base);
    }

    let symbol_per_base = snapshot.rate(symbol)?;
    Some(quote_per_base / symbol_per_base)
}

/// Percent changes of a fiat currency over every timeframe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeframeChanges {
    pub changes: BTreeMap<Timeframe, f64>,
    /// Timeframes with no snapshot (or no derivable rate) to compare against
    pub missing: Vec<Timeframe>,
}

/// Compare `now_rate` against the snapshot at or before `now_ms - timeframe`
/// for each timeframe.
pub fn timeframe_changes(
    series: &SnapshotSeries,
    now_rate: f64,
    now_ms: i64,
    symbol: &str,
    quote: &str,
) -> TimeframeChanges {
    let mut result = TimeframeChanges::default();

    for timeframe in Timeframe::ALL {
        let target = now_ms - timeframe.duration_ms();
        let past_rate = series
            .find_at_or_before(target)
            .and_then(|snapshot| cross_rate(snapshot, symbol, quote));

        if past_rate.is_none() {
            result.missing.push(timeframe);
        }

        result
            .changes
            .insert(timeframe, percent_change(now_rate, past_rate));
    }

    result
}
