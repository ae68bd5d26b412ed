use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::models::asset::{AssetBatch, AssetKind, AssetQuote, MarketAsset};
use crate::models::timeframe::Timeframe;
use crate::services::market_data::MarketDataError;

#[derive(Clone)]
pub struct CoinMarketCapService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<Cache<String, AssetBatch>>,
}

#[derive(Debug, Deserialize)]
struct CmcStatus {
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CmcResponse<T> {
    data: Option<T>,
    status: Option<CmcStatus>,
}

#[derive(Debug, Deserialize)]
struct CmcAsset {
    id: i64,
    name: String,
    symbol: String,
    slug: String,
    #[serde(default)]
    cmc_rank: Option<i64>,
    #[serde(default)]
    quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    price: Option<f64>,
    percent_change_1h: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_7d: Option<f64>,
    percent_change_30d: Option<f64>,
    percent_change_90d: Option<f64>,
}

impl CmcAsset {
    /// Trim to the fields the scoring core uses. Assets without a quote in
    /// `convert` are dropped.
    fn into_market_asset(self, convert: &str) -> Option<MarketAsset> {
        let Some(quote) = self.quote.get(convert) else {
            tracing::warn!("{} has no {} quote, skipping", self.symbol, convert);
            return None;
        };

        let percent_change: BTreeMap<Timeframe, f64> = [
            (Timeframe::H1, quote.percent_change_1h),
            (Timeframe::H24, quote.percent_change_24h),
            (Timeframe::D7, quote.percent_change_7d),
            (Timeframe::D30, quote.percent_change_30d),
            (Timeframe::D90, quote.percent_change_90d),
        ]
        .into_iter()
        .map(|(tf, change)| (tf, change.unwrap_or(0.0)))
        .collect();

        Some(MarketAsset {
            kind: AssetKind::Crypto,
            id: self.id,
            name: self.name,
            symbol: self.symbol,
            slug: self.slug,
            rank: self.cmc_rank.unwrap_or(0),
            quote: AssetQuote {
                price: quote.price.unwrap_or(0.0),
                percent_change,
            },
            missing_history: Vec::new(),
        })
    }
}

impl CoinMarketCapService {
    pub fn new(api_key: Option<String>, base_url: String, revalidate_secs: u64, timeout: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(Duration::from_secs(revalidate_secs))
            .build();

        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            api_key,
            base_url,
            cache: Arc::new(cache),
        }
    }

    fn api_key(&self) -> Result<&str, MarketDataError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MarketDataError::Configuration("CMC_API_KEY is not configured".to_string()))
    }

    async fn cmc_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<CmcResponse<T>, MarketDataError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-CMC_PRO_API_KEY", api_key)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("CoinMarketCap API error {}: {}", status, error_text);
            return Err(MarketDataError::Upstream {
                status: status.as_u16(),
                message: if error_text.is_empty() {
                    "CMC API error".to_string()
                } else {
                    error_text
                },
            });
        }

        Ok(response.json().await?)
    }

    pub async fn fetch_listings(&self, limit: u32, convert: &str) -> Result<AssetBatch, MarketDataError> {
        let cache_key = format!("listings_{}_{}", limit, convert);

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(cached);
        }

        tracing::info!("Fetching {} listings in {} from CoinMarketCap", limit, convert);

        let response: CmcResponse<Vec<CmcAsset>> = self
            .cmc_get(
                "/v1/cryptocurrency/listings/latest",
                &[("limit", limit.to_string()), ("convert", convert.to_string())],
            )
            .await?;

        let batch = AssetBatch {
            assets: response
                .data
                .unwrap_or_default()
                .into_iter()
                .filter_map(|asset| asset.into_market_asset(convert))
                .collect(),
            last_updated: response.status.and_then(|s| s.timestamp),
        };

        tracing::info!("Fetched {} listings from CoinMarketCap", batch.assets.len());

        self.cache.insert(cache_key, batch.clone()).await;
        Ok(batch)
    }

    pub async fn fetch_quotes(&self, symbols: &[String], convert: &str) -> Result<AssetBatch, MarketDataError> {
        let joined = symbols.join(",");
        let cache_key = format!("quotes_{}_{}", joined, convert);

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(cached);
        }

        tracing::info!("Fetching quotes for {} from CoinMarketCap", joined);

        let response: CmcResponse<HashMap<String, CmcAsset>> = self
            .cmc_get(
                "/v1/cryptocurrency/quotes/latest",
                &[("symbol", joined), ("convert", convert.to_string())],
            )
            .await?;

        let mut assets: Vec<MarketAsset> = response
            .data
            .unwrap_or_default()
            .into_values()
            .filter_map(|asset| asset.into_market_asset(convert))
            .collect();
        assets.sort_by_key(|a| a.rank);

        let batch = AssetBatch {
            assets,
            last_updated: response.status.and_then(|s| s.timestamp),
        };

        self.cache.insert(cache_key, batch.clone()).await;
        Ok(batch)
    }
}
