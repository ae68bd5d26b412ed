use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::fx::RateSnapshot;
use crate::services::market_data::MarketDataError;

/// ExchangeRate-API client for the latest FX rates against one reference
/// currency
#[derive(Clone)]
pub struct ExchangeRateService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<Cache<String, RateSnapshot>>,
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    conversion_rates: BTreeMap<String, f64>,
}

impl LatestRatesResponse {
    fn into_snapshot(self, reference: &str) -> Result<RateSnapshot, MarketDataError> {
        if self.result != "success" {
            return Err(MarketDataError::Upstream {
                status: 502,
                message: self.error_type.unwrap_or_else(|| "FX API error".to_string()),
            });
        }

        let timestamp = self
            .time_last_update_unix
            .ok_or_else(|| MarketDataError::Decode("missing time_last_update_unix".to_string()))?
            .checked_mul(1000)
            .ok_or_else(|| MarketDataError::Decode("time_last_update_unix out of range".to_string()))?;

        Ok(RateSnapshot::new(
            timestamp,
            self.base_code.unwrap_or_else(|| reference.to_string()),
            self.conversion_rates,
        ))
    }
}

impl ExchangeRateService {
    pub fn new(api_key: Option<String>, base_url: String, cache_secs: u64, timeout: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(cache_secs))
            .build();

        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            api_key,
            base_url,
            cache: Arc::new(cache),
        }
    }

    pub async fn fetch_latest(&self, reference: &str) -> Result<RateSnapshot, MarketDataError> {
        if let Some(cached) = self.cache.get(reference).await {
            tracing::debug!("Cache hit for FX rates in {}", reference);
            return Ok(cached);
        }

        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                MarketDataError::Configuration("EXCHANGE_RATE_API_KEY is not configured".to_string())
            })?;

        tracing::info!("Fetching latest FX rates for {}", reference);

        let url = format!("{}/{}/latest/{}", self.base_url, api_key, reference);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("FX API error {}: {}", status, error_text);
            return Err(MarketDataError::Upstream {
                status: status.as_u16(),
                message: if error_text.is_empty() {
                    "FX API error".to_string()
                } else {
                    error_text
                },
            });
        }

        let data: LatestRatesResponse = response.json().await?;
        let snapshot = data.into_snapshot(reference)?;

        tracing::debug!(
            timestamp = snapshot.timestamp,
            rates = snapshot.rates.len(),
            "Fetched FX rates"
        );

        self.cache.insert(reference.to_string(), snapshot.clone()).await;
        Ok(snapshot)
    }
}
