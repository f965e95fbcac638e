//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("session error: {0}")]
    Session(#[from] hopper_core::Error),

    #[error("storage error: {0}")]
    Storage(#[from] hopper_store::StoreError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Session(e) => match e {
                hopper_core::Error::InvalidFileName(_) => "invalid_file_name",
                hopper_core::Error::SessionNotFound(_) => "session_not_found",
                hopper_core::Error::InvalidState { .. } => "invalid_state",
                hopper_core::Error::AlreadyFinalizing(_) => "already_finalizing",
                hopper_core::Error::Incomplete { .. } => "incomplete_upload",
            },
            Self::Storage(_) => "storage_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(e) => match e {
                hopper_core::Error::InvalidFileName(_) => StatusCode::BAD_REQUEST,
                hopper_core::Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
                hopper_core::Error::InvalidState { .. } => StatusCode::CONFLICT,
                hopper_core::Error::AlreadyFinalizing(_) => StatusCode::CONFLICT,
                hopper_core::Error::Incomplete { .. } => StatusCode::BAD_REQUEST,
            },
            Self::Storage(e) => match e {
                hopper_store::StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
