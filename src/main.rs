use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strength_meter_backend::{
    AppState, build_router,
    config::AppConfig,
    services::{
        coinmarketcap::CoinMarketCapService, exchange_rate::ExchangeRateService,
        market_data::LiveMarketData, snapshot_store::SnapshotStore,
    },
};

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

    if config.cmc_api_key.is_none() {
        tracing::warn!("CMC_API_KEY not set, crypto endpoints will return 500");
    }
    if config.fx_api_key.is_none() {
        tracing::warn!("EXCHANGE_RATE_API_KEY not set, FX endpoints will return 500");
    }

    let cmc = CoinMarketCapService::new(
        config.cmc_api_key.clone(),
        config.cmc_base_url.clone(),
        config.cache_revalidate_secs,
        config.upstream_timeout,
    );
    let fx = ExchangeRateService::new(
        config.fx_api_key.clone(),
        config.fx_base_url.clone(),
        config.fx_cache_secs,
        config.upstream_timeout,
    );

    let snapshots = SnapshotStore::json_file(
        config.snapshot_path.clone(),
        config.retention(),
        config.lock_timeout,
    );
    tracing::info!(
        "FX snapshots at {} ({} day retention)",
        config.snapshot_path.display(),
        config.retention_days
    );

    let bind_address = config.bind_address.clone();
    let state = AppState {
        config: Arc::new(config),
        market_data: Arc::new(LiveMarketData::new(cmc, fx)),
        snapshots: Arc::new(snapshots),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
