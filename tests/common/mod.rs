use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use strength_meter_backend::AppState;
use strength_meter_backend::config::AppConfig;
use strength_meter_backend::models::asset::{AssetBatch, AssetKind, AssetQuote, MarketAsset};
use strength_meter_backend::models::fx::RateSnapshot;
use strength_meter_backend::models::timeframe::Timeframe;
use strength_meter_backend::services::market_data::{MarketDataError, MarketDataSource};
use strength_meter_backend::services::snapshot_store::{
    BackendLock, SnapshotBackend, SnapshotStore, StoreError,
};

/// Canned upstream: fixed listings and FX snapshot, or a fixed failure
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeMarketData {
    pub listings: Vec<MarketAsset>,
    pub fx: Option<RateSnapshot>,
    pub failure: Option<MarketDataError>,
    pub fx_delay: Option<Duration>,
    pub fx_calls: AtomicUsize,
}

#[async_trait]
impl MarketDataSource for FakeMarketData {
    async fn fetch_listings(&self, limit: u32, _convert: &str) -> Result<AssetBatch, MarketDataError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }

        Ok(AssetBatch {
            assets: self.listings.iter().take(limit as usize).cloned().collect(),
            last_updated: Some("2024-05-01T00:00:00.000Z".to_string()),
        })
    }

    async fn fetch_quotes(&self, symbols: &[String], _convert: &str) -> Result<AssetBatch, MarketDataError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }

        Ok(AssetBatch {
            assets: self
                .listings
                .iter()
                .filter(|a| symbols.contains(&a.symbol))
                .cloned()
                .collect(),
            last_updated: Some("2024-05-01T00:00:00.000Z".to_string()),
        })
    }

    async fn fetch_latest_fx(&self, _reference: &str) -> Result<RateSnapshot, MarketDataError> {
        self.fx_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.fx_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }

        self.fx.clone().ok_or_else(|| {
            MarketDataError::Configuration("EXCHANGE_RATE_API_KEY is not configured".to_string())
        })
    }
}

/// Crypto asset with percent changes for 1h, 24h, 7d, 30d and 90d
#[allow(dead_code)]
pub fn crypto_asset(id: i64, symbol: &str, name: &str, price: f64, changes: [f64; 5]) -> MarketAsset {
    MarketAsset {
        kind: AssetKind::Crypto,
        id,
        name: name.to_string(),
        symbol: symbol.to_string(),
        slug: name.to_lowercase(),
        rank: id,
        quote: AssetQuote {
            price,
            percent_change: Timeframe::ALL.iter().copied().zip(changes).collect(),
        },
        missing_history: Vec::new(),
    }
}

#[allow(dead_code)]
pub fn sample_listings() -> Vec<MarketAsset> {
    vec![
        crypto_asset(1, "BTC", "Bitcoin", 9_500_000.0, [1.0, 5.0, 10.0, 20.0, 30.0]),
        crypto_asset(2, "ETH", "Ethereum", 450_000.0, [0.0, 2.0, 4.0, 10.0, 20.0]),
        crypto_asset(3, "SOL", "Solana", 22_000.0, [2.0, -1.0, 0.0, 5.0, 10.0]),
    ]
}

#[allow(dead_code)]
pub fn usd_snapshot(timestamp: i64, jpy: f64, eur: f64) -> RateSnapshot {
    let rates: BTreeMap<String, f64> = [
        ("USD".to_string(), 1.0),
        ("JPY".to_string(), jpy),
        ("EUR".to_string(), eur),
    ]
    .into_iter()
    .collect();

    RateSnapshot::new(timestamp, "USD", rates)
}

#[allow(dead_code)]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        upstream_timeout: Duration::from_millis(200),
        ..AppConfig::default()
    }
}

#[allow(dead_code)]
pub fn test_state(market_data: FakeMarketData, snapshots: Arc<SnapshotStore>) -> AppState {
    AppState {
        config: Arc::new(test_config()),
        market_data: Arc::new(market_data),
        snapshots,
    }
}

/// Unique path under the system temp dir; nothing is created
#[allow(dead_code)]
pub fn temp_snapshot_path() -> PathBuf {
    std::env::temp_dir().join(format!("fx-snapshots-{}.json", uuid::Uuid::new_v4()))
}

#[allow(dead_code)]
pub async fn cleanup_snapshot_path(path: &PathBuf) {
    let _ = tokio::fs::remove_file(path).await;
}

/// Reads succeed (empty) but every write fails
#[allow(dead_code)]
pub struct FailingPersistBackend;

#[async_trait]
impl SnapshotBackend for FailingPersistBackend {
    async fn lock(&self) -> Result<BackendLock, StoreError> {
        Ok(BackendLock::in_process())
    }

    async fn load(&self) -> Result<Vec<RateSnapshot>, StoreError> {
        Ok(Vec::new())
    }

    async fn persist(&self, _snapshots: &[RateSnapshot]) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}
