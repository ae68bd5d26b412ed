// src/lib.rs

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::services::{market_data::MarketDataSource, snapshot_store::SnapshotStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub market_data: Arc<dyn MarketDataSource>,
    pub snapshots: Arc<SnapshotStore>,
}

pub mod config;

pub mod models {
    pub mod asset;
    pub mod error;
    pub mod fx;
    pub mod strength;
    pub mod timeframe;
}

pub mod services {
    pub mod coinmarketcap;
    pub mod exchange_rate;
    pub mod fx_assets;
    pub mod market_data;
    pub mod market_universe;
    pub mod rates;
    pub mod snapshot_series;
    pub mod snapshot_store;
    pub mod strength;
}

pub mod handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/api/crypto/listings", get(handlers::crypto::get_listings))
        .route("/api/crypto/quotes", get(handlers::crypto::get_quotes))
        .route("/api/fx/latest", get(handlers::fx::get_latest_fx))
        .route("/api/strength/relative", get(handlers::strength::get_relative_strength))
        .route("/api/strength/composite", get(handlers::strength::get_composite))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn hello() -> &'static str {
    "Hello from Strength Meter Backend!"
}
