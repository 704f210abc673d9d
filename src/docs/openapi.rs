//! OpenAPI specification for the relay API
//!
//! Aggregates the chat and health endpoints and their schemas into a single
//! OpenAPI document.

use utoipa::OpenApi;

use crate::{
    error::{ErrorBody, ErrorResponse},
    prompt::{ChatMessage, Role},
    routes::{
        chat::{ChatRequest, ChatResponse},
        health::{HealthResponse, HealthStatus, SimpleHealthResponse, TierSummary},
    },
};

/// OpenAPI specification for the tiered relay
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tiered Relay API",
        version = "1.0.0",
        description = "Chat relay that races LLM backends in latency tiers and falls back until one answers"
    ),
    paths(
        crate::routes::chat::chat,
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
    ),
    components(
        schemas(
            // Chat
            Role,
            ChatMessage,
            ChatRequest,
            ChatResponse,
            // Health
            HealthStatus,
            TierSummary,
            HealthResponse,
            SimpleHealthResponse,
            // Error
            ErrorBody,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Chat", description = "Tiered chat dispatch"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct RelayApiDoc;
