//! # Web API Error Types
//!
//! Error types specific to the HTTP surface and their response conversions.
//! Domain conditions keep their own status codes (slot not found -> 404,
//! lag too high -> 503); everything connectivity-shaped is a 500 rather
//! than a process abort.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::ReplicationError;

/// Web API errors with HTTP status code mappings.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("replication slot not found: {slot}")]
    SlotNotFound { slot: String },

    #[error("replication lag is too high for slot {slot}: {lag_ms}ms")]
    LagTooHigh { slot: String, lag_ms: i64 },

    #[error("internal server error: {message}")]
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, body) = match &self {
            ApiError::SlotNotFound { slot } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "replication slot not found", "slot": slot }),
            ),
            ApiError::LagTooHigh { slot, lag_ms } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "replication lag is too high", "slot": slot, "lag_ms": lag_ms }),
            ),
            ApiError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message }),
            ),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<ReplicationError> for ApiError {
    fn from(err: ReplicationError) -> Self {
        match err {
            ReplicationError::SlotNotFound { slot } => ApiError::SlotNotFound { slot },
            ReplicationError::LagTooHigh { slot, lag_ms } => ApiError::LagTooHigh { slot, lag_ms },
            other => ApiError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for handler bodies.
pub type ApiResult<T> = Result<T, ApiError>;
