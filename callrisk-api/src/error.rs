//! Error types for callrisk-api
//!
//! Every handler failure is rendered as
//! `{"error": {"code": "...", "message": "..."}}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed boundary validation (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Engine error: 404 for a missing artifact, 422 for a malformed one
    #[error(transparent)]
    Engine(#[from] callrisk_engine::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use callrisk_engine::Error as EngineError;

        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Engine(ref err) => match err {
                EngineError::MalformedArtifact(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "MALFORMED_ARTIFACT",
                    err.to_string(),
                ),
                EngineError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                EngineError::Config(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string()),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ENGINE_ERROR",
                    err.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
