//! Application configuration loaded from environment variables.
//!
//! Call `dotenvy::dotenv()` before [`AppConfig::from_env`] to pick up a
//! local `.env` file.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::timeframe::TimeframeWeights;
use crate::services::snapshot_store::DEFAULT_RETENTION_DAYS;

const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";
const ENV_CMC_API_KEY: &str = "CMC_API_KEY";
const ENV_CMC_BASE_URL: &str = "CMC_BASE_URL";
const ENV_FX_API_KEY: &str = "EXCHANGE_RATE_API_KEY";
const ENV_FX_BASE_URL: &str = "EXCHANGE_RATE_BASE_URL";
const ENV_QUOTE_CURRENCY: &str = "QUOTE_CURRENCY";
const ENV_REFERENCE_CURRENCY: &str = "FX_REFERENCE_CURRENCY";
const ENV_CACHE_REVALIDATE: &str = "CACHE_REVALIDATE_SECONDS";
const ENV_FX_CACHE: &str = "FX_CACHE_SECONDS";
const ENV_SNAPSHOT_PATH: &str = "FX_SNAPSHOT_PATH";
const ENV_RETENTION_DAYS: &str = "FX_RETENTION_DAYS";
const ENV_UPSTREAM_TIMEOUT: &str = "UPSTREAM_TIMEOUT_SECS";
const ENV_LOCK_TIMEOUT: &str = "SNAPSHOT_LOCK_TIMEOUT_MS";
const ENV_LISTINGS_LIMIT: &str = "LISTINGS_LIMIT";
const ENV_TIMEFRAME_WEIGHTS: &str = "TIMEFRAME_WEIGHTS";

const DEFAULT_CACHE_REVALIDATE_SECS: u64 = 300;
const DEFAULT_FX_CACHE_SECS: u64 = 3600;
/// 100 years
const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { var: &'static str, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { var, message } => write!(f, "Invalid {}: {}", var, message),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    /// Absence is reported per request, not at startup
    pub cmc_api_key: Option<String>,
    pub cmc_base_url: String,
    pub fx_api_key: Option<String>,
    pub fx_base_url: String,
    pub quote_currency: String,
    pub reference_currency: String,
    pub cache_revalidate_secs: u64,
    pub fx_cache_secs: u64,
    pub snapshot_path: PathBuf,
    pub retention_days: i64,
    pub upstream_timeout: Duration,
    pub lock_timeout: Duration,
    pub listings_limit: u32,
    pub weights: TimeframeWeights,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            cmc_api_key: None,
            cmc_base_url: "https://pro-api.coinmarketcap.com".to_string(),
            fx_api_key: None,
            fx_base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            quote_currency: "JPY".to_string(),
            reference_currency: "USD".to_string(),
            cache_revalidate_secs: DEFAULT_CACHE_REVALIDATE_SECS,
            fx_cache_secs: DEFAULT_FX_CACHE_SECS,
            snapshot_path: PathBuf::from("/tmp/strength-meter-fx-snapshots.json"),
            retention_days: DEFAULT_RETENTION_DAYS,
            upstream_timeout: Duration::from_secs(10),
            lock_timeout: Duration::from_millis(5000),
            listings_limit: 200,
            weights: TimeframeWeights::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Build from an explicit variable map; unset variables keep defaults.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(addr) = get(ENV_BIND_ADDRESS) {
            config.bind_address = addr;
        }
        config.cmc_api_key = get(ENV_CMC_API_KEY);
        config.fx_api_key = get(ENV_FX_API_KEY);
        if let Some(url) = get(ENV_CMC_BASE_URL) {
            config.cmc_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get(ENV_FX_BASE_URL) {
            config.fx_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(quote) = get(ENV_QUOTE_CURRENCY) {
            config.quote_currency = quote.to_uppercase();
        }
        if let Some(reference) = get(ENV_REFERENCE_CURRENCY) {
            config.reference_currency = reference.to_uppercase();
        }

        // Bad cache TTLs fall back to the default instead of failing startup
        config.cache_revalidate_secs = get(ENV_CACHE_REVALIDATE)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_CACHE_REVALIDATE_SECS);
        config.fx_cache_secs = get(ENV_FX_CACHE)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_FX_CACHE_SECS);

        if let Some(path) = get(ENV_SNAPSHOT_PATH) {
            config.snapshot_path = PathBuf::from(path);
        }
        if let Some(days) = get(ENV_RETENTION_DAYS) {
            config.retention_days = parse_positive(ENV_RETENTION_DAYS, &days)?;
            if config.retention_days > MAX_RETENTION_DAYS {
                return Err(ConfigError::Invalid {
                    var: ENV_RETENTION_DAYS,
                    message: format!("must be at most {}", MAX_RETENTION_DAYS),
                });
            }
        }
        if let Some(secs) = get(ENV_UPSTREAM_TIMEOUT) {
            config.upstream_timeout = Duration::from_secs(parse_positive(ENV_UPSTREAM_TIMEOUT, &secs)?);
        }
        if let Some(ms) = get(ENV_LOCK_TIMEOUT) {
            config.lock_timeout = Duration::from_millis(parse_positive(ENV_LOCK_TIMEOUT, &ms)?);
        }
        if let Some(limit) = get(ENV_LISTINGS_LIMIT) {
            config.listings_limit = parse_positive(ENV_LISTINGS_LIMIT, &limit)?;
        }
        if let Some(raw) = get(ENV_TIMEFRAME_WEIGHTS) {
            config.weights = TimeframeWeights::parse(&raw).map_err(|message| ConfigError::Invalid {
                var: ENV_TIMEFRAME_WEIGHTS,
                message,
            })?;
        }

        Ok(config)
    }

    /// Retention window, capped at `MAX_RETENTION_DAYS`.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days.clamp(0, MAX_RETENTION_DAYS))
    }
}

fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value: T = raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        message: e.to_string(),
    })?;

    if value <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            message: "must be positive".to_string(),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timeframe::Timeframe;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(&HashMap::new()).unwrap();

        assert_eq!(config.quote_currency, "JPY");
        assert_eq!(config.reference_currency, "USD");
        assert_eq!(config.retention_days, 120);
        assert_eq!(config.cache_revalidate_secs, 300);
        assert!(config.cmc_api_key.is_none());
        assert_eq!(config.weights, TimeframeWeights::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_vars(&vars(&[
            ("CMC_API_KEY", "abc"),
            ("QUOTE_CURRENCY", "usd"),
            ("FX_RETENTION_DAYS", "30"),
            ("TIMEFRAME_WEIGHTS", "24h=1,7d=1"),
            ("CMC_BASE_URL", "http://localhost:8080/"),
        ]))
        .unwrap();

        assert_eq!(config.cmc_api_key.as_deref(), Some("abc"));
        assert_eq!(config.quote_currency, "USD");
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.weights.get(Timeframe::H1), 0.0);
        assert_eq!(config.weights.sum(), 2.0);
        assert_eq!(config.cmc_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_bad_cache_ttl_falls_back() {
        let config = AppConfig::from_vars(&vars(&[("CACHE_REVALIDATE_SECONDS", "soon")])).unwrap();
        assert_eq!(config.cache_revalidate_secs, 300);

        let config = AppConfig::from_vars(&vars(&[("CACHE_REVALIDATE_SECONDS", "0")])).unwrap();
        assert_eq!(config.cache_revalidate_secs, 300);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(AppConfig::from_vars(&vars(&[("FX_RETENTION_DAYS", "-1")])).is_err());
        assert!(AppConfig::from_vars(&vars(&[("LISTINGS_LIMIT", "many")])).is_err());
        assert!(AppConfig::from_vars(&vars(&[("TIMEFRAME_WEIGHTS", "1h=x")])).is_err());
    }

    #[test]
    fn test_oversized_retention_is_rejected() {
        let err = AppConfig::from_vars(&vars(&[("FX_RETENTION_DAYS", "999999999999")])).unwrap_err();
        assert!(err.to_string().contains("FX_RETENTION_DAYS"));

        let config = AppConfig::from_vars(&vars(&[("FX_RETENTION_DAYS", "36500")])).unwrap();
        assert_eq!(config.retention(), chrono::Duration::days(36_500));
    }

    #[test]
    fn test_retention_of_hand_built_config_is_capped() {
        let config = AppConfig {
            retention_days: i64::MAX,
            ..AppConfig::default()
        };
        assert_eq!(config.retention(), chrono::Duration::days(36_500));
    }

    #[test]
    fn test_empty_api_key_counts_as_missing() {
        let config = AppConfig::from_vars(&vars(&[("EXCHANGE_RATE_API_KEY", "  ")])).unwrap();
        assert!(config.fx_api_key.is_none());
    }
}
