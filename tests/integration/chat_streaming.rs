//! Streaming chat dispatch tests
//!
//! Tests for `POST /api/chat` with `stream: true`: status frames per tier,
//! delta forwarding from the winner, and the single terminal frame.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{constants::*, sse_events, sse_text, test_data, tier, tiers, RelayTestHarness};

#[tokio::test]
async fn test_stream_forwards_winner_deltas() {
    let harness =
        RelayTestHarness::new(tiers(vec![tier("fast", 1_000, &["model-a", "model-b"])])).await;
    harness.search.mock_no_abstract().await;
    harness
        .gateway
        .mock_stream("model-a", &["Hel", "lo", " there"], 20)
        .await;
    harness.gateway.mock_stream_error("model-b", 503, 0).await;

    let response = harness
        .server
        .post("/api/chat")
        .json(&test_data::streaming_chat_request("hello"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "text/event-stream");
    assert_eq!(response.header("cache-control"), "no-cache");

    let events = sse_events(&response.text());
    assert_eq!(
        events.first(),
        Some(&json!({ "type": "status", "tier": "fast", "message": "Racing 2 fast models" }))
    );
    assert_eq!(sse_text(&events), "Hello there");
    assert_eq!(
        events.last(),
        Some(&json!({ "type": "done", "modelUsed": "model-a" }))
    );
}

#[tokio::test]
async fn test_stream_escalates_before_first_chunk() {
    let harness = RelayTestHarness::new(tiers(vec![
        tier("fast", 300, &["model-a"]),
        tier("heavy", 1_000, &["model-c"]),
    ]))
    .await;
    harness.search.mock_no_abstract().await;
    harness.gateway.mock_stream("model-a", &["late"], 1_500).await;
    harness.gateway.mock_stream("model-c", &["on time"], 10).await;

    let events = sse_events(
        &harness
            .server
            .post("/api/chat")
            .json(&test_data::streaming_chat_request("hello"))
            .await
            .text(),
    );

    let tiers_raced: Vec<&str> = events
        .iter()
        .filter(|e| e["type"] == "status")
        .filter_map(|e| e["tier"].as_str())
        .collect();
    assert_eq!(tiers_raced, vec!["fast", "heavy"]);
    assert_eq!(sse_text(&events), "on time");
    assert_eq!(events.last().unwrap()["modelUsed"], "model-c");
}

#[tokio::test]
async fn test_stream_error_after_content_keeps_partial_reply() {
    let harness = RelayTestHarness::new(tiers(vec![
        tier("fast", 1_000, &["model-a"]),
        tier("heavy", 1_000, &["model-b"]),
    ]))
    .await;
    harness.search.mock_no_abstract().await;
    harness
        .gateway
        .mock_stream_then_error("model-a", &["partial ", "answer"])
        .await;
    harness.gateway.mock_stream("model-b", &["backup"], 0).await;

    let events = sse_events(
        &harness
            .server
            .post("/api/chat")
            .json(&test_data::streaming_chat_request("hello"))
            .await
            .text(),
    );

    assert_eq!(sse_text(&events), "partial answer");
    assert_eq!(
        events.last(),
        Some(&json!({ "type": "done", "modelUsed": "model-a" }))
    );
    assert!(!events.iter().any(|e| e["type"] == "failed"));
    assert_eq!(harness.gateway.received_models().await, vec!["model-a"]);
}

#[tokio::test]
async fn test_stream_exhaustion_sends_apology_then_failed() {
    let harness = RelayTestHarness::new(tiers(vec![
        tier("fast", 500, &["model-a"]),
        tier("heavy", 500, &["model-b"]),
    ]))
    .await;
    harness.search.mock_no_abstract().await;
    harness.gateway.mock_stream_error("model-a", 429, 0).await;
    harness.gateway.mock_stream("model-b", &[], 0).await;

    let response = harness
        .server
        .post("/api/chat")
        .json(&test_data::streaming_chat_request("hello"))
        .await;

    // Headers are already sent when the dispatch runs, so the status stays 200
    assert_eq!(response.status_code(), StatusCode::OK);

    let events = sse_events(&response.text());
    let n = events.len();
    assert_eq!(events[n - 2], json!({ "type": "delta", "content": BUSY_REPLY }));
    assert_eq!(events[n - 1], json!({ "type": "failed" }));

    let terminal = events
        .iter()
        .filter(|e| e["type"] == "done" || e["type"] == "failed")
        .count();
    assert_eq!(terminal, 1);
}

#[tokio::test]
async fn test_stream_request_sets_stream_flag_upstream() {
    let harness = RelayTestHarness::new(tiers(vec![tier("fast", 1_000, &["model-a"])])).await;
    harness.search.mock_no_abstract().await;
    harness.gateway.mock_stream("model-a", &["ok"], 0).await;

    harness
        .server
        .post("/api/chat")
        .json(&test_data::streaming_chat_request("hello"))
        .await;

    let bodies: Vec<Value> = harness.gateway.received_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["stream"], true);
    assert_eq!(bodies[0]["model"], "model-a");
}
