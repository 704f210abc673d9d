//! HTTP routes for the relay
//!
//! This module defines all HTTP endpoints exposed by the service.

pub mod chat;
pub mod health;
pub mod metrics;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{docs::RelayApiDoc, AppState};

/// Slack on top of the dispatch ceiling before the server gives up on a request
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(RelayApiDoc::openapi())
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_timeout = state.config.dispatch_ceiling + REQUEST_TIMEOUT_SLACK;

    let api_routes = Router::new().route(
        "/api/chat",
        post(chat::chat).fallback(chat::method_not_allowed),
    );

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/docs/openapi.json", get(openapi_json));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
