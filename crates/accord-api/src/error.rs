//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Protocol errors keep their stable machine-readable code and are mapped
//! to a status by error class:
//!
//! | Class          | Status |
//! |----------------|--------|
//! | authorization  | 403    |
//! | not found      | 404    |
//! | state          | 409    |
//! | balance        | 422    |
//! | validation     | 422    |
//! | external       | 502    |
//!
//! Internal error details are never returned to clients.

use accord_agreement::{AgreementError, ErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "CANNOT_SETTLE_ACTION", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context. Protocol errors carry their class here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A protocol operation was rejected.
    #[error(transparent)]
    Protocol(#[from] AgreementError),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or path could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No caller identity on the request (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Protocol(err) => (status_for(err.kind()), err.code()),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::Balance | ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::External => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Protocol(err) if err.kind() == ErrorKind::External => {
                tracing::warn!(error = %err, code, "collaborator failure")
            }
            _ => tracing::debug!(error = %self, code, "request rejected"),
        }

        let details = match &self {
            Self::Protocol(err) => Some(serde_json::json!({ "kind": err.kind().as_str() })),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Malformed identifiers in paths or bodies.
impl From<accord_core::CoreError> for AppError {
    fn from(err: accord_core::CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}
