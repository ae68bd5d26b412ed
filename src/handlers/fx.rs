use axum::{
    Json,
    extract::{Query, State},
};

use crate::AppState;
use crate::handlers::{ApiError, market_data_error, now_ms, parse_symbols};
use crate::models::fx::{FxLatestQuery, FxLatestResponse};
use crate::services::fx_assets::{DEFAULT_FX_SYMBOLS, refresh_fx_assets};
use crate::services::market_universe::fx_options;

/// Handler for GET /api/fx/latest
///
/// Runs one FX refresh cycle: fetch, record the snapshot, and report fiat
/// prices and percent changes in the quote currency.
pub async fn get_latest_fx(
    State(state): State<AppState>,
    Query(query): Query<FxLatestQuery>,
) -> Result<Json<FxLatestResponse>, ApiError> {
    let mut symbols = parse_symbols(query.symbols.as_deref())?;
    if symbols.is_empty() {
        symbols = DEFAULT_FX_SYMBOLS.iter().map(|s| s.to_string()).collect();
    }

    let refresh = refresh_fx_assets(
        state.market_data.as_ref(),
        &state.snapshots,
        &symbols,
        &fx_options(&state.config),
        now_ms(),
    )
    .await
    .map_err(market_data_error)?;

    if !refresh.persisted {
        tracing::warn!("FX snapshot not persisted this cycle, history may be shallow");
    }

    Ok(Json(FxLatestResponse {
        last_updated: refresh.last_updated(),
        data: refresh.assets,
    }))
}
