mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use strength_meter_backend::build_router;
use strength_meter_backend::services::market_data::MarketDataError;
use strength_meter_backend::services::snapshot_store::SnapshotStore;

use crate::common::{FakeMarketData, now_ms, sample_listings, test_state, usd_snapshot};

fn live_market() -> FakeMarketData {
    FakeMarketData {
        listings: sample_listings(),
        fx: Some(usd_snapshot(now_ms() - 60_000, 150.0, 0.9)),
        ..FakeMarketData::default()
    }
}

fn router_with(market: FakeMarketData) -> (Router, Arc<SnapshotStore>) {
    let store = Arc::new(SnapshotStore::in_memory(chrono::Duration::days(120)));
    (build_router(test_state(market, store.clone())), store)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn approx(value: &Value, expected: f64) -> bool {
    (value.as_f64().unwrap() - expected).abs() < 1e-9
}

#[tokio::test]
async fn test_relative_strength_rows() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(
        app,
        "/api/strength/relative?focal=btc&benchmarks=ETH,SOL,NOPE&timeframe=24h",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["focal"], "BTC");
    assert_eq!(json["timeframe"], "24h");

    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3, "unknown benchmark is skipped");
    assert_eq!(rows[0]["symbol"], "BTC");
    assert!(approx(&rows[0]["rpd"], 0.0));
    assert_eq!(rows[1]["symbol"], "ETH");
    assert!(approx(&rows[1]["rpd"], 3.0));
    assert_eq!(rows[2]["symbol"], "SOL");
    assert!(approx(&rows[2]["rpd"], 6.0));
    assert!(approx(&rows[2]["percentChange"], -1.0));
}

#[tokio::test]
async fn test_composite_with_default_weights() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(app, "/api/strength/composite?focal=BTC&benchmarks=ETH,SOL").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["benchmarks"], serde_json::json!(["ETH", "SOL"]));
    assert!(approx(&json["perTimeframe"]["1h"], 0.0));
    assert!(approx(&json["perTimeframe"]["24h"], 4.5));
    assert!(approx(&json["perTimeframe"]["90d"], 15.0));
    // 0.15*4.5 + 0.25*8 + 0.30*12.5 + 0.25*15
    assert!(approx(&json["composite"], 10.175));
    assert_eq!(json["descriptor"]["rank"], "strong");
}

#[tokio::test]
async fn test_composite_against_fiat_without_history() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(app, "/api/strength/composite?focal=BTC&benchmarks=USD").await;

    assert_eq!(status, StatusCode::OK);
    // A fresh series gives fiat 0% changes, so the score is BTC's own move
    assert!(approx(&json["composite"], 16.8));
    assert_eq!(json["descriptor"]["rank"], "strong");
}

#[tokio::test]
async fn test_focal_defaults_to_btc_and_preset_to_top10() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(app, "/api/strength/composite").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["focal"], "BTC");
    // Only the top-10 members present in the universe, minus the focal
    assert_eq!(json["benchmarks"], serde_json::json!(["ETH", "SOL"]));
}

#[tokio::test]
async fn test_unknown_focal_is_not_found() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(app, "/api/strength/relative?focal=NOPE").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("NOPE"));
}

#[tokio::test]
async fn test_invalid_parameters_are_bad_requests() {
    let (app, _) = router_with(live_market());

    let (status, _) = get_json(app.clone(), "/api/strength/relative?timeframe=2w").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(app.clone(), "/api/strength/composite?preset=bluechips").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(app, "/api/crypto/quotes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "symbols parameter is required");
}

#[tokio::test]
async fn test_quotes_keyed_by_symbol() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(app, "/api/crypto/quotes?symbols=eth,sol").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["ETH"]["name"], "Ethereum");
    assert_eq!(json["data"]["SOL"]["kind"], "crypto");
    assert!(json["data"].get("BTC").is_none());
}

#[tokio::test]
async fn test_listings_respect_limit() {
    let (app, _) = router_with(live_market());

    let (status, json) = get_json(app, "/api/crypto/listings?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["lastUpdated"], "2024-05-01T00:00:00.000Z");
}

#[tokio::test]
async fn test_missing_credentials_is_server_error() {
    let (app, _) = router_with(FakeMarketData {
        failure: Some(MarketDataError::Configuration(
            "CMC_API_KEY is not configured".to_string(),
        )),
        ..FakeMarketData::default()
    });

    let (status, json) = get_json(app, "/api/crypto/listings").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "CMC_API_KEY is not configured");
}

#[tokio::test]
async fn test_upstream_status_passes_through() {
    let (app, _) = router_with(FakeMarketData {
        failure: Some(MarketDataError::Upstream {
            status: 429,
            message: "rate limited".to_string(),
        }),
        ..FakeMarketData::default()
    });

    let (status, json) = get_json(app, "/api/strength/composite").await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "rate limited");
}

#[tokio::test]
async fn test_fx_latest_records_snapshot() {
    let (app, store) = router_with(live_market());

    let (status, json) = get_json(app, "/api/fx/latest?symbols=USD,EUR,JPY").await;

    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().unwrap();
    let symbols: Vec<&str> = data.iter().map(|a| a["symbol"].as_str().unwrap()).collect();
    assert_eq!(symbols, vec!["USD", "EUR", "JPY"]);
    assert!(approx(&data[0]["quote"]["price"], 150.0));
    assert_eq!(data[0]["kind"], "fiat");
    assert_eq!(data[0]["missingHistory"].as_array().unwrap().len(), 5);
    assert!(approx(&data[2]["quote"]["price"], 1.0));

    assert_eq!(store.load().await.len(), 1);
}

#[tokio::test]
async fn test_fx_timeout_leaves_store_untouched() {
    let (app, store) = router_with(FakeMarketData {
        fx_delay: Some(Duration::from_secs(2)),
        ..live_market()
    });

    let (status, _) = get_json(app, "/api/fx/latest").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(store.load().await.is_empty());
}
