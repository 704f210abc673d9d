//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with the active tier layout
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// One configured tier, as reported by `/health`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TierSummary {
    pub name: String,
    pub budget_ms: u64,
    pub models: Vec<String>,
}

/// Full health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub dispatch_ceiling_ms: u64,
    pub tiers: Vec<TierSummary>,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

/// Full health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let dispatcher = &state.dispatcher;
    let tiers = dispatcher
        .tiers()
        .into_iter()
        .map(|tier| TierSummary {
            name: tier.name.clone(),
            budget_ms: tier.budget.as_millis() as u64,
            models: tier.models.iter().map(|m| m.to_string()).collect(),
        })
        .collect();

    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        dispatch_ceiling_ms: dispatcher.ceiling().as_millis() as u64,
        tiers,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe endpoint
///
/// Ready once at least one tier with at least one model is configured.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready for traffic", body = SimpleHealthResponse),
        (status = 503, description = "No models configured", body = SimpleHealthResponse)
    )
)]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    if state.dispatcher.tiers().model_count() == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is alive", body = SimpleHealthResponse))
)]
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
