//! Context lookup tests
//!
//! The search snippet for the last message is folded into the system
//! preamble; every lookup problem falls back to the default context.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::Value;

use tiered_relay::{
    context::{ContextSource, SearchClient, DEFAULT_CONTEXT},
    tiers::TierSet,
};

use crate::common::{constants::*, test_config, test_data, tier, tiers, RelayTestHarness};
use crate::mocks::MockSearch;

async fn system_preamble(harness: &RelayTestHarness) -> String {
    let bodies: Vec<Value> = harness.gateway.received_bodies().await;
    bodies[0]["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_snippet_is_injected_into_preamble() {
    let harness = RelayTestHarness::new(tiers(vec![tier("fast", 1_000, &["model-a"])])).await;
    harness
        .search
        .mock_abstract_for("capital of France", "Paris is the capital of France.")
        .await;
    harness.gateway.mock_reply("model-a", "Paris", 0).await;

    harness
        .server
        .post("/api/chat")
        .json(&test_data::chat_request("capital of France"))
        .await;

    assert_eq!(
        system_preamble(&harness).await,
        format!(
            "You are {}. Use this context: Paris is the capital of France.",
            TEST_ASSISTANT_NAME
        )
    );

    let bodies: Vec<Value> = harness.gateway.received_bodies().await;
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
    assert_eq!(bodies[0]["messages"][1]["content"], "capital of France");
}

#[tokio::test]
async fn test_search_failure_uses_default_context() {
    let harness = RelayTestHarness::new(tiers(vec![tier("fast", 1_000, &["model-a"])])).await;
    harness.search.mock_error(500).await;
    harness.gateway.mock_reply("model-a", "still answers", 0).await;

    let response = harness
        .server
        .post("/api/chat")
        .json(&test_data::chat_request("anything"))
        .await;

    assert_eq!(response.status_code(), axum::http::StatusCode::OK);
    assert!(system_preamble(&harness).await.ends_with(DEFAULT_CONTEXT));
}

#[tokio::test]
async fn test_last_message_is_the_query() {
    let harness = RelayTestHarness::new(tiers(vec![tier("fast", 1_000, &["model-a"])])).await;
    harness
        .search
        .mock_abstract_for("And of Italy?", "Rome is the capital of Italy.")
        .await;
    harness.gateway.mock_reply("model-a", "Rome", 0).await;

    harness
        .server
        .post("/api/chat")
        .json(&test_data::conversation_request())
        .await;

    assert!(system_preamble(&harness)
        .await
        .ends_with("Rome is the capital of Italy."));
}

#[tokio::test]
async fn test_disabled_search_skips_lookup() {
    let harness = RelayTestHarness::with_config(
        tiers(vec![tier("fast", 1_000, &["model-a"])]),
        |config| config.search_enabled = false,
    )
    .await;
    harness.search.mock_abstract("should not be used").await;
    harness.gateway.mock_reply("model-a", "ok", 0).await;

    harness
        .server
        .post("/api/chat")
        .json(&test_data::chat_request("hello"))
        .await;

    assert_eq!(harness.search.request_count().await, 0);
    assert!(system_preamble(&harness).await.ends_with(DEFAULT_CONTEXT));
}

#[tokio::test]
async fn test_search_client_outcomes() {
    let search = MockSearch::start().await;
    search.mock_abstract("  Rust is a language.  ").await;
    let mut config = test_config("http://127.0.0.1:9", &search.url(), TierSet::default());
    let client = SearchClient::new(reqwest::Client::new(), &config);
    assert_eq!(client.lookup("rust").await, "Rust is a language.");

    let empty = MockSearch::start().await;
    empty.mock_no_abstract().await;
    config.search_api_url = empty.url();
    let client = SearchClient::new(reqwest::Client::new(), &config);
    assert_eq!(client.lookup("rust").await, DEFAULT_CONTEXT);
}

#[tokio::test]
async fn test_search_client_times_out() {
    let search = MockSearch::start().await;
    search.mock_slow("too late", 2_000).await;
    let mut config = test_config("http://127.0.0.1:9", &search.url(), TierSet::default());
    config.search_timeout = Duration::from_millis(100);

    let client = SearchClient::new(reqwest::Client::new(), &config);
    let started = std::time::Instant::now();
    assert_eq!(client.lookup("slow").await, DEFAULT_CONTEXT);
    assert!(started.elapsed() < Duration::from_millis(1_500));
}
