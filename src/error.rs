//! Application-wide error types and the structured error body.
//!
//! Every error the service returns over HTTP uses the same JSON envelope:
//!
//! ```json
//! {"error": {"code": "RATE_LIMITED", "message": "Too many requests"}}
//! ```
//!
//! The `code` field is a machine-readable enum string (`UNAUTHORIZED`,
//! `RATE_LIMITED`, `INTERNAL_ERROR`, ...); `message` is human-readable and
//! `details` is an optional object with extra context. Core components
//! (authenticator, rate limiter) never build HTTP responses themselves; the
//! middleware and handlers translate their results through this module.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error types with appropriate HTTP status codes.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// The `error` object inside the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "UNAUTHORIZED", "RATE_LIMITED").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional additional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Structured error response envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl ErrorBody {
    /// Build an error body with no details.
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Build a JSON error response with the standard envelope.
///
/// Used by middleware that must produce terminal responses (401, 429)
/// without going through a handler.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(code, message))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full error server-side; clients get sanitized messages only
        tracing::error!(error = %self, "Request failed");

        let (status, code, message) = match &self {
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Service configuration error. Please contact support.",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An unexpected error occurred",
            ),
        };

        error_response(status, code, message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
