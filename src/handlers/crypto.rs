use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::AppState;
use crate::handlers::{ApiError, error_response, market_data_error, parse_symbol, parse_symbols};
use crate::models::asset::{ListingsQuery, ListingsResponse, QuotesQuery, QuotesResponse};

const DEFAULT_LISTINGS_LIMIT: u32 = 100;
const MAX_LISTINGS_LIMIT: u32 = 5000;

/// Handler for GET /api/crypto/listings
pub async fn get_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LISTINGS_LIMIT).clamp(1, MAX_LISTINGS_LIMIT);
    let convert = match query.convert.as_deref() {
        Some(c) => parse_symbol(c)?,
        None => state.config.quote_currency.clone(),
    };

    tracing::info!("Fetching {} crypto listings in {}", limit, convert);

    let batch = state
        .market_data
        .fetch_listings(limit, &convert)
        .await
        .map_err(market_data_error)?;

    Ok(Json(ListingsResponse {
        data: batch.assets,
        last_updated: batch.last_updated.unwrap_or_else(|| Utc::now().to_rfc3339()),
    }))
}

/// Handler for GET /api/crypto/quotes
pub async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> Result<Json<QuotesResponse>, ApiError> {
    let symbols = parse_symbols(query.symbols.as_deref())?;
    if symbols.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "symbols parameter is required",
        ));
    }

    let convert = match query.convert.as_deref() {
        Some(c) => parse_symbol(c)?,
        None => state.config.quote_currency.clone(),
    };

    let batch = state
        .market_data
        .fetch_quotes(&symbols, &convert)
        .await
        .map_err(market_data_error)?;

    Ok(Json(QuotesResponse {
        data: batch
            .assets
            .into_iter()
            .map(|asset| (asset.symbol.clone(), asset))
            .collect(),
        last_updated: batch.last_updated,
    }))
}
