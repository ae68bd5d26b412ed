use crate::config::AppConfig;
use crate::models::asset::MarketAsset;
use crate::services::fx_assets::{DEFAULT_FX_SYMBOLS, FxCycleOptions, refresh_fx_assets};
use crate::services::market_data::{MarketDataError, MarketDataSource};
use crate::services::snapshot_store::SnapshotStore;

pub fn fx_options(config: &AppConfig) -> FxCycleOptions {
    FxCycleOptions {
        reference_currency: config.reference_currency.clone(),
        quote_currency: config.quote_currency.clone(),
        fetch_timeout: config.upstream_timeout,
    }
}

/// Every asset a focal or benchmark symbol can resolve to: crypto listings
/// first, then the major fiat currencies.
///
/// Both upstream fetches run concurrently; either failing fails the whole
/// universe.
pub async fn load_market_universe(
    source: &dyn MarketDataSource,
    store: &SnapshotStore,
    config: &AppConfig,
    now_ms: i64,
) -> Result<Vec<MarketAsset>, MarketDataError> {
    let fx_symbols: Vec<String> = DEFAULT_FX_SYMBOLS.iter().map(|s| s.to_string()).collect();
    let options = fx_options(config);

    let (listings, fx) = tokio::join!(
        source.fetch_listings(config.listings_limit, &config.quote_currency),
        refresh_fx_assets(source, store, &fx_symbols, &options, now_ms)
    );

    let mut universe = listings?.assets;
    universe.extend(fx?.assets);

    tracing::debug!("Market universe has {} assets", universe.len());

    Ok(universe)
}
