//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Maximum size for JSON control-plane bodies (64 KiB).
pub const MAX_CONTROL_BODY_SIZE: usize = 64 * 1024;

/// Parse a JSON request body.
///
/// Malformed JSON is a client error, not a content-negotiation failure, so
/// it maps to 400 rather than axum's default 415/422 extractor rejections.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.len() > MAX_CONTROL_BODY_SIZE {
        return Err(ApiError::BadRequest(format!(
            "request body exceeds {MAX_CONTROL_BODY_SIZE} bytes"
        )));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}
