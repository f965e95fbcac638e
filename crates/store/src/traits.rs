//! Storage trait definitions.

use crate::error::StoreResult;
use async_trait::async_trait;
use bytes::Bytes;
use hopper_core::SessionId;

/// Streaming sink for an artifact under assembly.
///
/// Data written to the sink is not visible at the artifact location until
/// `finish` succeeds. Dropping a sink without calling `finish` or `abort`
/// leaves a temp file behind; callers should prefer `abort` on error paths.
#[async_trait]
pub trait ArtifactSink: Send {
    /// Append a block of data to the artifact.
    async fn write(&mut self, data: Bytes) -> StoreResult<()>;

    /// Durably publish the artifact, returning its total size in bytes.
    async fn finish(self: Box<Self>) -> StoreResult<u64>;

    /// Discard everything written so far.
    async fn abort(self: Box<Self>) -> StoreResult<()>;
}

/// Backend-agnostic chunk and artifact storage.
///
/// Chunk payloads are keyed by `(session, index)`. Writes to the same key
/// replace the previous payload atomically; concurrent writers race and the
/// last to publish wins, which is acceptable because clients re-sending an
/// index are re-sending the same logical chunk.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Store a chunk payload, replacing any existing payload at the index.
    async fn put_chunk(&self, session: &SessionId, index: u32, data: Bytes) -> StoreResult<()>;

    /// Retrieve a chunk payload.
    ///
    /// Returns `StoreError::NotFound` when no payload exists at the index.
    async fn get_chunk(&self, session: &SessionId, index: u32) -> StoreResult<Bytes>;

    /// Remove a single chunk payload. Removing an absent chunk is a no-op.
    async fn remove_chunk(&self, session: &SessionId, index: u32) -> StoreResult<()>;

    /// Remove all chunk payloads for a session, returning how many were
    /// deleted. Removing an absent session yields 0.
    async fn remove_session(&self, session: &SessionId) -> StoreResult<u64>;

    /// Open a streaming sink for the session's artifact.
    async fn open_artifact(&self, session: &SessionId) -> StoreResult<Box<dyn ArtifactSink>>;

    /// Remove a published artifact. Removing an absent artifact is a no-op.
    async fn remove_artifact(&self, session: &SessionId) -> StoreResult<()>;

    /// Check whether a published artifact exists for the session.
    async fn artifact_exists(&self, session: &SessionId) -> StoreResult<bool>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is usable (directories exist, writable, etc.).
    async fn health_check(&self) -> StoreResult<()>;
}
