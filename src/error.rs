//! Error types for the relay
//!
//! HTTP-facing errors. Dispatch internals keep their own error enums in
//! `dispatch::error`; this is where they become status codes.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::dispatch::{DispatchError, BUSY_MESSAGE};

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method not allowed, use POST")]
    MethodNotAllowed,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("All models are currently busy")]
    AllModelsBusy,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::AllTiersExhausted { .. } => AppError::AllModelsBusy,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Apology text, present when the caller should show it as the reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, reply) = match &self {
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                self.to_string(),
                None,
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            AppError::AllModelsBusy => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ALL_MODELS_BUSY",
                self.to_string(),
                Some(BUSY_MESSAGE.to_string()),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            reply,
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, AppError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
