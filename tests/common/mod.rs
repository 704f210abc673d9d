//! Common test utilities for the relay
//!
//! Shared fixtures and the end-to-end harness: a real router and app state
//! wired to wiremock servers standing in for the gateway and search API.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use serde_json::{json, Value};

use tiered_relay::{
    routes,
    tiers::{Tier, TierSet},
    AppState, Config,
};

use crate::mocks::{MockGateway, MockSearch, MOCK_GATEWAY_KEY};

/// Test configuration constants
pub mod constants {
    pub const TEST_ASSISTANT_NAME: &str = "Relay";
    pub const TEST_APP_TITLE: &str = "Relay Tests";
    pub const BUSY_REPLY: &str = "All models are currently busy. Please try again shortly.";
    pub const DEFAULT_CONTEXT: &str = "No search snippet found.";
}

/// Config pointing at the given mock servers
pub fn test_config(gateway_url: &str, search_url: &str, tiers: TierSet) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        gateway_api_url: gateway_url.to_string(),
        gateway_api_key: MOCK_GATEWAY_KEY.to_string(),
        gateway_app_title: Some(constants::TEST_APP_TITLE.to_string()),
        search_api_url: search_url.to_string(),
        search_enabled: true,
        search_timeout: Duration::from_millis(500),
        dispatch_ceiling: Duration::from_secs(10),
        tiers,
        assistant_name: constants::TEST_ASSISTANT_NAME.to_string(),
        default_temperature: None,
        default_max_tokens: None,
    }
}

/// One tier with a millisecond budget
pub fn tier(name: &str, budget_ms: u64, models: &[&str]) -> Tier {
    Tier::new(name, Duration::from_millis(budget_ms), models.iter().copied())
}

/// Validated tier set, in escalation order
pub fn tiers(tiers: Vec<Tier>) -> TierSet {
    TierSet::new(tiers).expect("valid test tiers")
}

/// Sample request bodies
pub mod test_data {
    use super::*;

    pub fn chat_request(content: &str) -> Value {
        json!({
            "messages": [
                { "role": "user", "content": content }
            ]
        })
    }

    pub fn streaming_chat_request(content: &str) -> Value {
        json!({
            "messages": [
                { "role": "user", "content": content }
            ],
            "stream": true
        })
    }

    pub fn conversation_request() -> Value {
        json!({
            "messages": [
                { "role": "user", "content": "What is the capital of France?" },
                { "role": "assistant", "content": "Paris." },
                { "role": "user", "content": "And of Italy?" }
            ],
            "temperature": 0.2,
            "max_tokens": 64
        })
    }
}

/// End-to-end harness: app router served in-process, collaborators mocked
pub struct RelayTestHarness {
    pub server: TestServer,
    pub gateway: MockGateway,
    pub search: MockSearch,
}

impl RelayTestHarness {
    /// Harness with the given tiers and default settings
    pub async fn new(tiers: TierSet) -> Self {
        Self::with_config(tiers, |_| {}).await
    }

    /// Harness whose config can be adjusted before the app is built
    pub async fn with_config(tiers: TierSet, adjust: impl FnOnce(&mut Config)) -> Self {
        let gateway = MockGateway::start().await;
        let search = MockSearch::start().await;

        let mut config = test_config(&gateway.uri(), &search.url(), tiers);
        adjust(&mut config);

        let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
        let app = routes::create_router(state);
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            gateway,
            search,
        }
    }
}

/// Parse an SSE body into its JSON `data:` payloads
pub fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str(data).ok())
        .collect()
}

/// Concatenated `delta` contents of an SSE event list
pub fn sse_text(events: &[Value]) -> String {
    events
        .iter()
        .filter(|e| e["type"] == "delta")
        .filter_map(|e| e["content"].as_str())
        .collect()
}
