//! Dispatch logging utilities
//!
//! Gives every inbound chat request a short correlation id so the log lines
//! of one dispatch (context lookup, tier races, outcome) can be grouped.

use std::time::Instant;
use tracing::{error, info, Span};
use uuid::Uuid;

use crate::tiers::ModelId;

/// Context for tracking one dispatch through the system
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Unique identifier for this dispatch (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Inbound endpoint
    pub endpoint: String,
    /// Whether the caller asked for a streamed reply
    pub streaming: bool,
    /// Messages in the caller's conversation
    pub message_count: usize,
}

impl DispatchContext {
    pub fn new(endpoint: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(),
            start_time: Instant::now(),
            endpoint: endpoint.to_string(),
            streaming: false,
            message_count: 0,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_message_count(mut self, message_count: usize) -> Self {
        self.message_count = message_count;
        self
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    pub fn log_dispatch_start(&self) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            streaming = %self.streaming,
            messages = self.message_count,
            "Dispatch started"
        );
    }

    /// Log which context the preamble was built with
    pub fn log_context_ready(&self, context_len: usize) {
        info!(
            trace_id = %self.trace_id,
            context_len,
            elapsed_ms = %self.elapsed_ms(),
            "Context lookup finished"
        );
    }

    pub fn log_dispatch_complete(&self, model: &ModelId) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            model = %model,
            streaming = %self.streaming,
            elapsed_ms = %self.elapsed_ms(),
            "Dispatch completed successfully"
        );
    }

    pub fn log_stream_opened(&self) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            elapsed_ms = %self.elapsed_ms(),
            "Streaming response opened"
        );
    }

    pub fn log_error(&self, error: &str) {
        error!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            streaming = %self.streaming,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Dispatch failed"
        );
    }

    /// Create a tracing span for this dispatch
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "dispatch",
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            streaming = %self.streaming,
        )
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}
