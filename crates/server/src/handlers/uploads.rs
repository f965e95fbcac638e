//! Upload data and control plane handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::parse_json;
use crate::reassemble::ArtifactInfo;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use bytes::Bytes;
use hopper_core::SessionId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Query parameters for chunk uploads.
///
/// Both fields are optional at the type level so a missing parameter maps
/// to the standard 400 error body instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct UploadChunkParams {
    /// Target file name, which doubles as the session id.
    pub file_name: Option<String>,
    /// Zero-based chunk index.
    pub chunk_index: Option<String>,
}

/// Response for a stored chunk.
#[derive(Debug, Serialize)]
pub struct UploadChunkResponse {
    /// Target file name.
    pub file_name: String,
    /// Index that was stored.
    pub chunk_index: u32,
    /// Payload size in bytes.
    pub size_bytes: u64,
}

/// Request body for finalizing an upload.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    /// Target file name.
    pub file_name: String,
    /// Declared number of chunks in the complete file.
    pub total_chunks: u32,
}

/// Request body for cancelling an upload.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Target file name.
    pub file_name: String,
}

/// Response for a cancelled upload.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Target file name.
    pub file_name: String,
    /// Always "cancelled"; retries of an already-cancelled or unknown
    /// session get the same answer.
    pub status: &'static str,
}

/// POST /upload?file_name=...&chunk_index=... - Store one chunk.
///
/// The raw request body is the chunk payload. Chunks may arrive in any
/// order and in parallel; re-sending an index replaces the stored payload.
pub async fn upload_chunk(
    State(state): State<AppState>,
    Query(params): Query<UploadChunkParams>,
    body: Bytes,
) -> ApiResult<Json<UploadChunkResponse>> {
    let file_name = params
        .file_name
        .ok_or_else(|| ApiError::BadRequest("missing file_name parameter".to_string()))?;
    let chunk_index = params
        .chunk_index
        .ok_or_else(|| ApiError::BadRequest("missing chunk_index parameter".to_string()))?
        .parse::<u32>()
        .map_err(|_| {
            ApiError::BadRequest("chunk_index must be a non-negative integer".to_string())
        })?;

    let limits = &state.config.server;
    if chunk_index >= limits.max_chunks_per_session {
        return Err(ApiError::BadRequest(format!(
            "chunk_index {chunk_index} exceeds limit of {} chunks per session",
            limits.max_chunks_per_session
        )));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty chunk payload".to_string()));
    }
    if body.len() as u64 > limits.max_chunk_size {
        return Err(ApiError::BadRequest(format!(
            "chunk payload of {} bytes exceeds limit of {} bytes",
            body.len(),
            limits.max_chunk_size
        )));
    }

    let id = SessionId::parse(&file_name)?;
    let size_bytes = body.len() as u64;
    state.registry.record_chunk(&id, chunk_index, body).await?;

    debug!(session = %id, chunk_index, size_bytes, "stored chunk");
    Ok(Json(UploadChunkResponse {
        file_name,
        chunk_index,
        size_bytes,
    }))
}

/// POST /finalize-upload - Reassemble a session into its artifact.
///
/// Declares the total chunk count, verifies the session holds exactly
/// indices `0..total_chunks`, and streams them in order into the published
/// file. Exactly one concurrent finalize per session wins.
pub async fn finalize_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ArtifactInfo>> {
    let request: FinalizeRequest = parse_json(&body)?;

    if request.total_chunks == 0 {
        return Err(ApiError::BadRequest(
            "total_chunks must be at least 1".to_string(),
        ));
    }
    if request.total_chunks > state.config.server.max_chunks_per_session {
        return Err(ApiError::BadRequest(format!(
            "total_chunks {} exceeds limit of {} chunks per session",
            request.total_chunks, state.config.server.max_chunks_per_session
        )));
    }

    let id = SessionId::parse(&request.file_name)?;
    let snapshot = state
        .registry
        .begin_finalize(&id, request.total_chunks)
        .await?;
    let info = state.reassembler.run(snapshot).await?;

    info!(session = %id, size_bytes = info.size_bytes, "upload finalized");
    Ok(Json(info))
}

/// POST /cancel-upload - Cancel a session and discard its chunks.
///
/// Idempotent: cancelling an unknown or already-cancelled session returns
/// 200 like the first call did.
pub async fn cancel_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<CancelResponse>> {
    let request: CancelRequest = parse_json(&body)?;
    let id = SessionId::parse(&request.file_name)?;

    state.cancel.cancel(&id).await?;
    info!(session = %id, "upload cancelled");
    Ok(Json(CancelResponse {
        file_name: request.file_name,
        status: "cancelled",
    }))
}
