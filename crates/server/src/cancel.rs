//! Session cancellation.

use crate::error::ApiResult;
use crate::metrics;
use crate::registry::SessionRegistry;
use hopper_core::{SessionId, SessionState};
use hopper_store::ChunkStore;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Cancels sessions and reclaims their storage.
///
/// Cancellation flips the session state first, so concurrent chunk writes
/// and reassembly observe it, then removes stored chunks and drops the
/// registry entry. The whole operation is idempotent: cancelling an unknown
/// or already-cancelled session succeeds without complaint.
pub struct CancellationHandler {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ChunkStore>,
}

impl CancellationHandler {
    /// Create a new cancellation handler.
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<dyn ChunkStore>) -> Self {
        Self { registry, store }
    }

    /// Cancel a session and remove its stored chunks.
    ///
    /// Storage cleanup failures are logged and swallowed; the state flip is
    /// what stops further writes, and leftover payloads are rewritten or
    /// reclaimed on the next contact with the same file name.
    #[instrument(skip(self), fields(session = %id))]
    pub async fn cancel(&self, id: &SessionId) -> ApiResult<()> {
        let prior = self.registry.begin_cancel(id).await;

        match self.store.remove_session(id).await {
            Ok(removed) if removed > 0 => {
                debug!(session = %id, chunks = removed, "removed cancelled session chunks");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(session = %id, error = %e, "failed to remove chunks for cancelled session");
            }
        }

        match prior {
            None => {
                // Unknown session: nothing tracked, nothing stored. Report
                // success so retried cancellations are harmless.
                debug!(session = %id, "cancel of unknown session ignored");
            }
            Some(prior) => {
                self.registry.retire(id);
                if prior != SessionState::Cancelled {
                    metrics::SESSIONS_CANCELLED.inc();
                }
            }
        }
        Ok(())
    }

    /// Cancel every tracked session. Used during shutdown so no partial
    /// uploads survive as stray chunk directories.
    pub async fn drain(&self) -> usize {
        let ids = self.registry.session_ids();
        let mut cancelled = 0;
        for id in ids {
            if self.cancel(&id).await.is_ok() {
                cancelled += 1;
            }
        }
        cancelled
    }
}
