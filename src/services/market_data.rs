//! Upstream market data collaborators.
//!
//! Everything the scoring core needs from outside (crypto quotes and FX
//! rates) comes through [`MarketDataSource`], so tests and binaries can swap
//! the live HTTP clients for fixtures.

use async_trait::async_trait;

use crate::models::asset::AssetBatch;
use crate::models::fx::RateSnapshot;
use crate::services::coinmarketcap::CoinMarketCapService;
use crate::services::exchange_rate::ExchangeRateService;

#[derive(Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Missing credentials or settings for an upstream provider
    Configuration(String),
    /// Upstream answered with a non-success status
    Upstream { status: u16, message: String },
    Timeout(String),
    Transport(String),
    Decode(String),
}

impl MarketDataError {
    /// HTTP status reported to API callers
    pub fn status_code(&self) -> u16 {
        match self {
            MarketDataError::Configuration(_) => 500,
            MarketDataError::Upstream { status, .. } => *status,
            MarketDataError::Timeout(_) => 504,
            MarketDataError::Transport(_) | MarketDataError::Decode(_) => 502,
        }
    }
}

impl std::fmt::Display for MarketDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketDataError::Configuration(msg) => write!(f, "{}", msg),
            MarketDataError::Upstream { message, .. } => write!(f, "{}", message),
            MarketDataError::Timeout(msg) => write!(f, "Upstream timeout: {}", msg),
            MarketDataError::Transport(msg) => write!(f, "Upstream request failed: {}", msg),
            MarketDataError::Decode(msg) => write!(f, "Invalid upstream response: {}", msg),
        }
    }
}

impl std::error::Error for MarketDataError {}

impl From<reqwest::Error> for MarketDataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MarketDataError::Timeout(e.to_string())
        } else if e.is_decode() {
            MarketDataError::Decode(e.to_string())
        } else {
            MarketDataError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Top crypto assets by rank, quoted in `convert`
    async fn fetch_listings(&self, limit: u32, convert: &str) -> Result<AssetBatch, MarketDataError>;

    /// Quotes for specific crypto symbols, quoted in `convert`
    async fn fetch_quotes(&self, symbols: &[String], convert: &str) -> Result<AssetBatch, MarketDataError>;

    /// Latest FX rates per unit of `reference`
    async fn fetch_latest_fx(&self, reference: &str) -> Result<RateSnapshot, MarketDataError>;
}

/// Live HTTP providers: CoinMarketCap for crypto, ExchangeRate-API for FX
#[derive(Clone)]
pub struct LiveMarketData {
    cmc: CoinMarketCapService,
    fx: ExchangeRateService,
}

impl LiveMarketData {
    pub fn new(cmc: CoinMarketCapService, fx: ExchangeRateService) -> Self {
        Self { cmc, fx }
    }
}

#[async_trait]
impl MarketDataSource for LiveMarketData {
    async fn fetch_listings(&self, limit: u32, convert: &str) -> Result<AssetBatch, MarketDataError> {
        self.cmc.fetch_listings(limit, convert).await
    }

    async fn fetch_quotes(&self, symbols: &[String], convert: &str) -> Result<AssetBatch, MarketDataError> {
        self.cmc.fetch_quotes(symbols, convert).await
    }

    async fn fetch_latest_fx(&self, reference: &str) -> Result<RateSnapshot, MarketDataError> {
        self.fx.fetch_latest(reference).await
    }
}
