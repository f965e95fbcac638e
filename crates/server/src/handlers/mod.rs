//! HTTP request handlers.

pub mod common;
pub mod uploads;

pub use uploads::{cancel_upload, finalize_upload, upload_chunk};

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Storage backend in use.
    pub backend: &'static str,
}

/// GET /v1/health - Health check endpoint.
///
/// Verifies the storage backend is reachable so load balancers never route
/// uploads at an instance that cannot persist them.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.store.health_check().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        backend: state.store.backend_name(),
    }))
}
