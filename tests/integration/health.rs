//! Health, metrics and docs endpoint tests
//!
//! - GET /health - Status, version and active tier layout
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe
//! - GET /metrics - Prometheus text
//! - GET /docs/openapi.json - Generated API document

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use tiered_relay::routes::metrics::init_metrics;

use crate::common::{test_data, tier, tiers, RelayTestHarness};

async fn harness() -> RelayTestHarness {
    RelayTestHarness::new(tiers(vec![
        tier("fast", 700, &["a", "b"]),
        tier("heavy", 1_500, &["c"]),
    ]))
    .await
}

#[tokio::test]
async fn test_health_reports_tiers() {
    let harness = harness().await;

    let response = harness.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["dispatch_ceiling_ms"], 10_000);
    assert_eq!(
        body["tiers"],
        serde_json::json!([
            { "name": "fast", "budget_ms": 700, "models": ["a", "b"] },
            { "name": "heavy", "budget_ms": 1500, "models": ["c"] }
        ])
    );
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let harness = harness().await;

    let live = harness.server.get("/health/live").await;
    assert_eq!(live.status_code(), StatusCode::OK);
    assert_eq!(live.json::<Value>()["status"], "healthy");

    let ready = harness.server.get("/health/ready").await;
    assert_eq!(ready.status_code(), StatusCode::OK);
    assert_eq!(ready.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_exposes_dispatch_counters() {
    init_metrics();
    let harness = harness().await;
    harness.search.mock_no_abstract().await;
    harness.gateway.mock_reply("a", "hi", 0).await;

    harness
        .server
        .post("/api/chat")
        .json(&test_data::chat_request("hello"))
        .await;

    let response = harness.server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("relay_dispatch_total"));
    assert!(text.contains("relay_candidate_total"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let harness = harness().await;

    let response = harness.server.get("/docs/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let doc: Value = response.json();
    assert_eq!(doc["info"]["title"], "Tiered Relay API");
    assert!(doc["paths"]["/api/chat"]["post"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let harness = harness().await;
    let response = harness.server.get("/v1/chat/completions").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
