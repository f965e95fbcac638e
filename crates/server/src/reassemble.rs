//! Chunk reassembly into published artifacts.

use crate::error::ApiResult;
use crate::registry::SessionRegistry;
use hopper_core::{Error, SessionSnapshot, SessionState};
use hopper_store::ChunkStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Description of a published artifact.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ArtifactInfo {
    /// The file name the artifact was published under.
    pub file_name: String,
    /// Total artifact size in bytes.
    pub size_bytes: u64,
    /// Number of chunks assembled.
    pub total_chunks: u32,
}

/// Streams chunks in index order into an artifact sink.
///
/// The reassembler only runs for a session the caller moved to `Finalizing`,
/// so chunk arrivals cannot race the read loop. Cancellation can: the state
/// is re-checked at every chunk boundary, and once more when publishing, so
/// a cancelled session never leaves an artifact behind.
pub struct Reassembler {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ChunkStore>,
}

impl Reassembler {
    /// Create a new reassembler.
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<dyn ChunkStore>) -> Self {
        Self { registry, store }
    }

    /// Assemble the session's chunks into a published artifact.
    ///
    /// Chunks are appended strictly in index order and removed from storage
    /// as they are consumed. On any storage failure the session is marked
    /// `Failed` and the partial artifact discarded.
    #[instrument(skip(self, snapshot), fields(session = %snapshot.id, total_chunks = snapshot.total_chunks))]
    pub async fn run(&self, snapshot: SessionSnapshot) -> ApiResult<ArtifactInfo> {
        let id = &snapshot.id;

        let mut sink = match self.store.open_artifact(id).await {
            Ok(sink) => sink,
            Err(e) => {
                self.registry.mark_failed(id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        for index in 0..snapshot.total_chunks {
            // A cancellation that lands mid-assembly is honored at the next
            // chunk boundary.
            let state = self.registry.state_of(id).await;
            if state != Some(SessionState::Finalizing) {
                let _ = sink.abort().await;
                return Err(Error::InvalidState {
                    id: id.to_string(),
                    state: state.unwrap_or(SessionState::Cancelled),
                }
                .into());
            }

            let data = match self.store.get_chunk(id, index).await {
                Ok(data) => data,
                Err(e) => {
                    let _ = sink.abort().await;
                    self.registry.mark_failed(id, &e.to_string()).await;
                    return Err(e.into());
                }
            };
            if let Err(e) = sink.write(data).await {
                let _ = sink.abort().await;
                self.registry.mark_failed(id, &e.to_string()).await;
                return Err(e.into());
            }
            if let Err(e) = self.store.remove_chunk(id, index).await {
                warn!(session = %id, index, error = %e, "failed to remove consumed chunk");
            }
        }

        let size_bytes = match sink.finish().await {
            Ok(size) => size,
            Err(e) => {
                self.registry.mark_failed(id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        // The artifact is published; settle the race against cancellation
        // under the session lock. If a cancel slipped into the publish
        // window it wins and the artifact is withdrawn.
        match self.registry.mark_completed(id).await {
            SessionState::Completed => {
                info!(session = %id, size_bytes, "artifact published");
                Ok(ArtifactInfo {
                    file_name: id.to_string(),
                    size_bytes,
                    total_chunks: snapshot.total_chunks,
                })
            }
            state => {
                if let Err(e) = self.store.remove_artifact(id).await {
                    warn!(session = %id, error = %e, "failed to withdraw artifact after cancellation");
                }
                Err(Error::InvalidState {
                    id: id.to_string(),
                    state,
                }
                .into())
            }
        }
    }
}
