use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::handlers::{ApiError, error_response, market_data_error, now_ms, parse_symbol, parse_symbols};
use crate::models::asset::MarketAsset;
use crate::models::strength::{
    CompositeQuery, CompositeResponse, Preset, RelativeStrengthQuery, RelativeStrengthResponse,
};
use crate::models::timeframe::Timeframe;
use crate::services::market_universe::load_market_universe;
use crate::services::strength::{
    StrengthError, composite_for, compute_relative_strength, select, strength_descriptor,
};

const DEFAULT_FOCAL: &str = "BTC";

/// Benchmark symbols from `preset` and/or an explicit list.
///
/// An explicit list without a preset is a custom basket; no input at all
/// means the top-10 preset.
fn resolve_benchmarks(preset: Option<&str>, benchmarks: Option<&str>) -> Result<Vec<String>, ApiError> {
    let explicit = parse_symbols(benchmarks)?;

    let preset = match preset {
        Some(raw) => raw
            .parse::<Preset>()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?,
        None if !explicit.is_empty() => Preset::Custom,
        None => Preset::Top10,
    };

    Ok(match preset {
        Preset::Custom => explicit,
        other => other.symbols().iter().map(|s| s.to_string()).collect(),
    })
}

/// Requested focal symbol, else BTC, else the top asset of the universe.
fn resolve_focal(requested: Option<&str>, universe: &[MarketAsset]) -> Result<String, ApiError> {
    if let Some(raw) = requested {
        return parse_symbol(raw);
    }

    if universe.iter().any(|a| a.symbol == DEFAULT_FOCAL) {
        return Ok(DEFAULT_FOCAL.to_string());
    }

    universe
        .first()
        .map(|a| a.symbol.clone())
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No market data available"))
}

fn strength_error(e: StrengthError) -> ApiError {
    match e {
        StrengthError::UnknownSymbol(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

async fn universe(state: &AppState) -> Result<Vec<MarketAsset>, ApiError> {
    load_market_universe(
        state.market_data.as_ref(),
        &state.snapshots,
        &state.config,
        now_ms(),
    )
    .await
    .map_err(market_data_error)
}

/// Handler for GET /api/strength/relative
pub async fn get_relative_strength(
    State(state): State<AppState>,
    Query(query): Query<RelativeStrengthQuery>,
) -> Result<Json<RelativeStrengthResponse>, ApiError> {
    let timeframe = match query.timeframe.as_deref() {
        Some(raw) => raw
            .parse::<Timeframe>()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?,
        None => Timeframe::H24,
    };
    let benchmarks = resolve_benchmarks(query.preset.as_deref(), query.benchmarks.as_deref())?;

    let universe = universe(&state).await?;
    let focal = resolve_focal(query.focal.as_deref(), &universe)?;

    let rows = compute_relative_strength(&universe, &focal, &benchmarks, timeframe)
        .map_err(strength_error)?;

    tracing::info!(
        "Relative strength for {} over {}: {} benchmarks",
        focal,
        timeframe,
        rows.len().saturating_sub(1)
    );

    Ok(Json(RelativeStrengthResponse {
        focal,
        timeframe,
        rows,
    }))
}

/// Handler for GET /api/strength/composite
pub async fn get_composite(
    State(state): State<AppState>,
    Query(query): Query<CompositeQuery>,
) -> Result<Json<CompositeResponse>, ApiError> {
    let benchmarks = resolve_benchmarks(query.preset.as_deref(), query.benchmarks.as_deref())?;

    let universe = universe(&state).await?;
    let focal = resolve_focal(query.focal.as_deref(), &universe)?;

    let selection = select(&universe, &focal, &benchmarks).map_err(strength_error)?;
    let result = composite_for(&selection, &state.config.weights);

    tracing::info!(
        "Composite strength for {}: {:.2} against {} benchmarks",
        focal,
        result.composite,
        selection.benchmarks.len()
    );

    Ok(Json(CompositeResponse {
        benchmarks: selection.benchmarks.iter().map(|b| b.symbol.clone()).collect(),
        descriptor: strength_descriptor(result.composite),
        per_timeframe: result.per_timeframe,
        composite: result.composite,
        focal,
    }))
}
