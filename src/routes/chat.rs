//! Chat endpoint
//!
//! `POST /api/chat` looks up context for the latest message, builds the
//! prompt and hands it to the tiered dispatcher. Buffered requests get one
//! JSON reply; `stream: true` turns the dispatch events into SSE frames.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use utoipa::ToSchema;

use crate::{
    context::DEFAULT_CONTEXT,
    dispatch::StreamEvent,
    error::{AppError, AppResult, ErrorResponse},
    prompt::{last_message_text, preamble, CallParams, ChatMessage, Prompt},
    proxy::DispatchContext,
    routes::metrics::record_dispatch,
    streaming::format_event,
    tiers::ModelId,
    AppState,
};

/// Chat request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,
    /// Stream the reply as server-sent events
    #[serde(default)]
    pub stream: bool,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Chat reply
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    /// Model that produced the reply
    #[serde(rename = "modelUsed")]
    #[schema(value_type = String)]
    pub model_used: ModelId,
}

/// Handle a chat request
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Reply from the first model to answer", body = ChatResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 405, description = "Method other than POST", body = ErrorResponse),
        (status = 503, description = "No model answered in time", body = ErrorResponse)
    )
)]
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Response> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    if request.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }

    let ctx = DispatchContext::new("/api/chat")
        .with_streaming(request.stream)
        .with_message_count(request.messages.len());
    let span = ctx.create_span();
    ctx.log_dispatch_start();

    let context = match last_message_text(&request.messages) {
        Some(query) => state.context.lookup(query).instrument(span.clone()).await,
        None => DEFAULT_CONTEXT.to_string(),
    };
    ctx.log_context_ready(context.len());

    let params = CallParams {
        temperature: request.temperature.or(state.config.default_temperature),
        max_tokens: request.max_tokens.or(state.config.default_max_tokens),
    };
    let prompt = Prompt::build(
        preamble(&state.config.assistant_name, &context),
        request.messages,
        params,
    )
    .ok_or_else(|| AppError::BadRequest("messages must not be empty".to_string()))?;

    if request.stream {
        stream_reply(&state, prompt, ctx, span)
    } else {
        buffered_reply(&state, prompt, ctx, span).await
    }
}

async fn buffered_reply(
    state: &AppState,
    prompt: Prompt,
    ctx: DispatchContext,
    span: tracing::Span,
) -> AppResult<Response> {
    match state.dispatcher.dispatch(&prompt).instrument(span).await {
        Ok(reply) => {
            ctx.log_dispatch_complete(&reply.model);
            record_dispatch("success", ctx.start_time.elapsed().as_secs_f64());
            Ok(Json(ChatResponse {
                reply: reply.text,
                model_used: reply.model,
            })
            .into_response())
        }
        Err(e) => {
            ctx.log_error(&e.to_string());
            record_dispatch("exhausted", ctx.start_time.elapsed().as_secs_f64());
            Err(e.into())
        }
    }
}

fn stream_reply(
    state: &AppState,
    prompt: Prompt,
    ctx: DispatchContext,
    span: tracing::Span,
) -> AppResult<Response> {
    ctx.log_stream_opened();

    let frames = state
        .dispatcher
        .dispatch_streaming(prompt, span)
        .map(move |event| {
            match &event {
                StreamEvent::Done { model_used } => {
                    ctx.log_dispatch_complete(model_used);
                    record_dispatch("stream_success", ctx.start_time.elapsed().as_secs_f64());
                }
                StreamEvent::Failed => {
                    ctx.log_error("all tiers exhausted before any content");
                    record_dispatch("stream_exhausted", ctx.start_time.elapsed().as_secs_f64());
                }
                _ => {}
            }
            Ok::<_, Infallible>(format_event(&event))
        });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(frames))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}

/// Any method other than POST on the chat endpoint
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
