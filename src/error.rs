//! Error types for the proxy
//!
//! Every failure that reaches the HTTP boundary is rendered as an
//! OpenAI-style `{"error": {"message", "type", "code"}}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A failed call to the upstream driver endpoint.
///
/// Upstream failure shapes are inconsistent, so the decoded body is kept
/// verbatim (when it was JSON) next to a flattened summary message.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamFailure {
    /// HTTP status of the upstream response, if one was received
    pub status: Option<u16>,
    /// Decoded JSON body, when the body was valid JSON
    pub body: Option<Value>,
    /// Human-readable summary
    pub message: String,
}

impl UpstreamFailure {
    /// Build a failure from a structured upstream body.
    pub fn from_body(status: Option<u16>, body: Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
            .or_else(|| body.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        Self {
            status,
            body: Some(body),
            message,
        }
    }

    /// Build a failure from a raw text message.
    pub fn from_message(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Timed out waiting for a session token: {0}")]
    AcquisitionTimeout(String),

    #[error("Browser not found: {0}")]
    BrowserNotFound(String),

    #[error("Browser control channel error: {0}")]
    ChannelError(String),

    #[error("Upstream error: {0}")]
    Upstream(UpstreamFailure),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The upstream failure carried by this error, if any
    pub fn upstream_failure(&self) -> Option<&UpstreamFailure> {
        match self {
            AppError::Upstream(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match &self {
            AppError::AcquisitionTimeout(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "authentication_error",
                "acquisition_timeout",
                msg.clone(),
            ),
            AppError::BrowserNotFound(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "authentication_error",
                "browser_not_found",
                msg.clone(),
            ),
            AppError::ChannelError(msg) => (
                StatusCode::BAD_GATEWAY,
                "authentication_error",
                "channel_error",
                msg.clone(),
            ),
            AppError::Upstream(failure) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "upstream_error",
                failure.message.clone(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
                msg.clone(),
            ),
            AppError::HttpError(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "upstream_unreachable",
                self.to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal_error",
                self.to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                message,
                error_type: error_type.to_string(),
                code: code.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
