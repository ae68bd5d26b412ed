use axum::{Json, http::StatusCode};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::error::ErrorResponse;
use crate::services::market_data::MarketDataError;

pub mod crypto;
pub mod fx;
pub mod strength;

lazy_static! {
    static ref SYMBOL_REGEX: Regex = Regex::new(r"^[A-Z0-9]{1,15}$").unwrap();
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map an upstream failure to the status the upstream (or our
/// configuration) implies.
pub fn market_data_error(e: MarketDataError) -> ApiError {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!("Market data request failed: {}", e);
    } else {
        tracing::warn!("Market data request rejected upstream: {}", e);
    }

    error_response(status, e.to_string())
}

/// Split a comma-separated symbol list, upper-casing and dropping blanks.
pub fn parse_symbols(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .map(|s| parse_symbol(&s))
        .collect()
}

pub fn parse_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = raw.trim().to_uppercase();
    if SYMBOL_REGEX.is_match(&symbol) {
        Ok(symbol)
    } else {
        Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid symbol: {}", raw.trim()),
        ))
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        let parsed = parse_symbols(Some(" btc, ETH ,,sol ")).unwrap();
        assert_eq!(parsed, vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn test_parse_symbols_missing_is_empty() {
        assert!(parse_symbols(None).unwrap().is_empty());
        assert!(parse_symbols(Some(" , ")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_symbols_rejects_invalid() {
        let (status, body) = parse_symbols(Some("BTC,ET$H")).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid symbol: ET$H");
    }

    #[test]
    fn test_market_data_error_status() {
        let (status, body) = market_data_error(MarketDataError::Configuration(
            "CMC_API_KEY is not configured".to_string(),
        ));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "CMC_API_KEY is not configured");

        let (status, _) = market_data_error(MarketDataError::Upstream {
            status: 429,
            message: "rate limited".to_string(),
        });
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
