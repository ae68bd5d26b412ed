//! FX Refresh Cycle
//!
//! Fetches the latest FX rates, records them in the snapshot store and
//! derives per-timeframe percent changes for fiat currencies against the
//! quote currency from the stored history.
//!
//! A failed or timed-out fetch aborts the cycle before the store is
//! touched. A storage failure only costs history depth: the cycle still
//! answers from the in-memory series.

use chrono::DateTime;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::asset::{AssetKind, AssetQuote, MarketAsset};
use crate::models::fx::RateSnapshot;
use crate::services::market_data::{MarketDataError, MarketDataSource};
use crate::services::rates::{cross_rate, timeframe_changes};
use crate::services::snapshot_series::SnapshotSeries;
use crate::services::snapshot_store::SnapshotStore;

pub const DEFAULT_FX_SYMBOLS: [&str; 8] = ["USD", "EUR", "JPY", "GBP", "AUD", "CAD", "CHF", "CNY"];

/// Fiat ids live above the crypto id range
const FIAT_ID_OFFSET: i64 = 900_000;

pub fn currency_name(symbol: &str) -> &str {
    match symbol {
        "USD" => "US Dollar",
        "EUR" => "Euro",
        "JPY" => "Japanese Yen",
        "GBP" => "British Pound",
        "AUD" => "Australian Dollar",
        "CAD" => "Canadian Dollar",
        "CHF" => "Swiss Franc",
        "CNY" => "Chinese Yuan",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct FxCycleOptions {
    /// Currency the upstream rates are expressed against
    pub reference_currency: String,
    /// Currency fiat prices are reported in
    pub quote_currency: String,
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FxRefresh {
    pub assets: Vec<MarketAsset>,
    pub snapshot: RateSnapshot,
    pub history_len: usize,
    /// False when this cycle's snapshot did not reach durable storage
    pub persisted: bool,
}

impl FxRefresh {
    pub fn last_updated(&self) -> String {
        DateTime::from_timestamp_millis(self.snapshot.timestamp)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

pub async fn refresh_fx_assets(
    source: &dyn MarketDataSource,
    store: &SnapshotStore,
    symbols: &[String],
    options: &FxCycleOptions,
    now_ms: i64,
) -> Result<FxRefresh, MarketDataError> {
    let snapshot = tokio::time::timeout(
        options.fetch_timeout,
        source.fetch_latest_fx(&options.reference_currency),
    )
    .await
    .map_err(|_| {
        MarketDataError::Timeout(format!(
            "FX fetch exceeded {}s",
            options.fetch_timeout.as_secs_f64()
        ))
    })??;

    let (series, persisted) = match store.append(snapshot.clone(), now_ms).await {
        Ok(recorded) => {
            let persisted = recorded.persist_error.is_none();
            (recorded.series, persisted)
        }
        Err(e) => {
            warn!(error = %e, "Snapshot store unavailable, using read-only history");
            let mut series = store.load().await;
            series.append(snapshot.clone());
            (series, false)
        }
    };

    let assets = build_fiat_assets(&snapshot, &series, symbols, &options.quote_currency, now_ms);

    info!(
        assets = assets.len(),
        history = series.len(),
        persisted = persisted,
        "FX refresh completed"
    );

    Ok(FxRefresh {
        assets,
        history_len: series.len(),
        snapshot,
        persisted,
    })
}

/// Fiat assets for `symbols`, in request order. Symbols whose current rate
/// cannot be derived from `current` are skipped.
pub fn build_fiat_assets(
    current: &RateSnapshot,
    series: &SnapshotSeries,
    symbols: &[String],
    quote: &str,
    now_ms: i64,
) -> Vec<MarketAsset> {
    symbols
        .iter()
        .enumerate()
        .filter_map(|(index, symbol)| {
            let Some(now_rate) = cross_rate(current, symbol, quote) else {
                debug!("No {} rate for {}, skipping", quote, symbol);
                return None;
            };

            let changes = timeframe_changes(series, now_rate, now_ms, symbol, quote);

            Some(MarketAsset {
                kind: AssetKind::Fiat,
                id: FIAT_ID_OFFSET + index as i64,
                name: currency_name(symbol).to_string(),
                symbol: symbol.clone(),
                slug: symbol.to_lowercase(),
                rank: 0,
                quote: AssetQuote {
                    price: now_rate,
                    percent_change: changes.changes,
                },
                missing_history: changes.missing,
            })
        })
        .collect()
}
