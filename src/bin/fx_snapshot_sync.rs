use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strength_meter_backend::config::AppConfig;
use strength_meter_backend::services::coinmarketcap::CoinMarketCapService;
use strength_meter_backend::services::exchange_rate::ExchangeRateService;
use strength_meter_backend::services::fx_assets::{DEFAULT_FX_SYMBOLS, refresh_fx_assets};
use strength_meter_backend::services::market_data::LiveMarketData;
use strength_meter_backend::services::market_universe::fx_options;
use strength_meter_backend::services::snapshot_store::SnapshotStore;

/// Runs one FX refresh cycle and exits. Schedule it (cron, systemd timer)
/// to keep history accumulating while the API is idle.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,strength_meter_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Only the FX provider is used; the CMC client stays unconfigured
    let market_data = LiveMarketData::new(
        CoinMarketCapService::new(None, config.cmc_base_url.clone(), 1, config.upstream_timeout),
        ExchangeRateService::new(
            config.fx_api_key.clone(),
            config.fx_base_url.clone(),
            config.fx_cache_secs,
            config.upstream_timeout,
        ),
    );
    let store = SnapshotStore::json_file(
        config.snapshot_path.clone(),
        config.retention(),
        config.lock_timeout,
    );

    let symbols: Vec<String> = DEFAULT_FX_SYMBOLS.iter().map(|s| s.to_string()).collect();
    let now_ms = chrono::Utc::now().timestamp_millis();

    tracing::info!("Starting FX snapshot sync into {}", config.snapshot_path.display());

    let refresh = refresh_fx_assets(&market_data, &store, &symbols, &fx_options(&config), now_ms).await?;

    for asset in &refresh.assets {
        tracing::info!(
            "{} = {:.4} {} (missing history: {:?})",
            asset.symbol,
            asset.quote.price,
            config.quote_currency,
            asset.missing_history
        );
    }

    if !refresh.persisted {
        return Err(format!(
            "snapshot at {} was not persisted to {}",
            refresh.last_updated(),
            config.snapshot_path.display()
        )
        .into());
    }

    tracing::info!(
        "✅ FX snapshot sync complete: {} snapshots retained, last update {}",
        refresh.history_len,
        refresh.last_updated()
    );

    Ok(())
}
