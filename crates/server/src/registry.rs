//! In-memory session registry.
//!
//! Tracks one [`UploadSession`] per file name behind a per-session async
//! mutex. The map itself is a [`DashMap`] so unrelated sessions never
//! contend. Session locks are never held across storage I/O: chunk recording
//! releases the lock before writing the payload and re-checks the state
//! afterwards, so a cancellation that lands mid-write is detected and the
//! stray payload removed instead of resurrecting the session.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use bytes::Bytes;
use dashmap::DashMap;
use hopper_core::{Error, SessionId, SessionSnapshot, SessionState, UploadSession};
use hopper_store::ChunkStore;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Registry of in-progress upload sessions.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Mutex<UploadSession>>>,
    store: Arc<dyn ChunkStore>,
}

impl SessionRegistry {
    /// Create a new registry backed by the given chunk store.
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
        }
    }

    /// Get the session entry for an id, creating an open session if absent.
    fn entry(&self, id: &SessionId) -> Arc<Mutex<UploadSession>> {
        if let Some(entry) = self.sessions.get(id) {
            return entry.clone();
        }
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| {
                metrics::SESSIONS_OPENED.inc();
                metrics::ACTIVE_SESSIONS.inc();
                debug!(session = %id, "opened upload session");
                Arc::new(Mutex::new(UploadSession::new(id.clone())))
            })
            .clone()
    }

    /// Store a chunk payload and record its index.
    ///
    /// Creates the session on first contact. The payload is written to
    /// storage with the session lock released; if the session reached a
    /// terminal state in the meantime the write is rolled back and the
    /// session is not resurrected.
    #[instrument(skip(self, data), fields(session = %id, size = data.len()))]
    pub async fn record_chunk(&self, id: &SessionId, index: u32, data: Bytes) -> ApiResult<()> {
        let entry = self.entry(id);

        {
            let session = entry.lock().await;
            if !session.state.is_active() {
                return Err(Error::InvalidState {
                    id: id.to_string(),
                    state: session.state,
                }
                .into());
            }
        }

        let size = data.len() as u64;
        self.store.put_chunk(id, index, data).await?;

        let mut session = entry.lock().await;
        match session.state {
            SessionState::Open => {
                session.received.insert(index);
                session.touch();
                metrics::CHUNKS_RECEIVED.inc();
                metrics::BYTES_RECEIVED.inc_by(size);
                Ok(())
            }
            state => {
                // The session was finalized or cancelled while the payload
                // was in flight. An index the reassembler counts on must
                // stay on disk; anything else is removed so cancellation
                // leaves no residue.
                let counted = state == SessionState::Finalizing && session.received.contains(&index);
                drop(session);
                if !counted
                    && let Err(e) = self.store.remove_chunk(id, index).await
                {
                    warn!(session = %id, index, error = %e, "failed to remove late chunk payload");
                }
                Err(Error::InvalidState {
                    id: id.to_string(),
                    state,
                }
                .into())
            }
        }
    }

    /// Transition a session from `Open` to `Finalizing` and hand back a
    /// snapshot for the reassembler.
    ///
    /// Exactly one caller wins this transition; losers observe
    /// `AlreadyFinalizing` or the terminal state. An incomplete session is
    /// rejected and remains `Open` so the client can top up the missing
    /// chunks and retry.
    ///
    /// Finalizing an unknown session with `total_chunks == 0` creates a
    /// degenerate session that assembles to an empty artifact.
    #[instrument(skip(self), fields(session = %id, total_chunks = total))]
    pub async fn begin_finalize(&self, id: &SessionId, total: u32) -> ApiResult<SessionSnapshot> {
        let entry = match self.sessions.get(id) {
            Some(entry) => entry.clone(),
            None if total == 0 => {
                let entry = self
                    .sessions
                    .entry(id.clone())
                    .or_insert_with(|| {
                        metrics::SESSIONS_OPENED.inc();
                        metrics::ACTIVE_SESSIONS.inc();
                        Arc::new(Mutex::new(UploadSession::new(id.clone())))
                    })
                    .clone();
                entry
            }
            None => return Err(Error::SessionNotFound(id.to_string()).into()),
        };

        let mut session = entry.lock().await;
        match session.state {
            SessionState::Open => {
                if !session.is_complete(total) {
                    return Err(Error::Incomplete {
                        expected: total,
                        received: session.received.len() as u32,
                        first_missing: session.first_missing(total),
                    }
                    .into());
                }
                session.total_chunks = Some(total);
                session.state = SessionState::Finalizing;
                session.touch();
                Ok(SessionSnapshot {
                    id: id.clone(),
                    total_chunks: total,
                })
            }
            SessionState::Finalizing => Err(Error::AlreadyFinalizing(id.to_string()).into()),
            state => Err(Error::InvalidState {
                id: id.to_string(),
                state,
            }
            .into()),
        }
    }

    /// Record the outcome of a successful reassembly.
    ///
    /// Returns the state observed under the lock: `Completed` when this call
    /// won, or the state a concurrent cancellation left behind. Only a
    /// `Finalizing` session flips to `Completed`; the caller must unpublish
    /// the artifact when anything else is observed.
    pub async fn mark_completed(&self, id: &SessionId) -> SessionState {
        let Some(entry) = self.sessions.get(id).map(|e| e.value().clone()) else {
            // Entry retired by a concurrent cancellation.
            return SessionState::Cancelled;
        };

        let observed = {
            let mut session = entry.lock().await;
            if session.state == SessionState::Finalizing {
                session.state = SessionState::Completed;
            }
            session.state
        };

        if observed == SessionState::Completed {
            // A re-upload of an already-counted index can recreate a chunk
            // file after the reassembler consumed and removed it. Sweep the
            // session directory before retiring the entry so completion
            // leaves nothing behind.
            match self.store.remove_session(id).await {
                Ok(0) => {}
                Ok(removed) => {
                    warn!(session = %id, removed, "removed stray chunks left by late re-uploads");
                }
                Err(e) => {
                    warn!(session = %id, error = %e, "failed to sweep chunks after completion");
                }
            }
            self.retire(id);
            metrics::SESSIONS_COMPLETED.inc();
        }
        observed
    }

    /// Record a reassembly failure. Only a `Finalizing` session flips to
    /// `Failed`; a concurrent cancellation wins otherwise.
    pub async fn mark_failed(&self, id: &SessionId, reason: &str) {
        let Some(entry) = self.sessions.get(id).map(|e| e.value().clone()) else {
            return;
        };

        let mut session = entry.lock().await;
        if session.state == SessionState::Finalizing {
            session.state = SessionState::Failed;
            metrics::SESSIONS_FAILED.inc();
            warn!(session = %id, reason, "upload session failed");
        }
    }

    /// Flip a session to `Cancelled`, returning the prior state.
    ///
    /// Returns `None` for unknown sessions. The flip is immediate; in-flight
    /// chunk writes observe it when they re-check the state, and an in-flight
    /// reassembly observes it at its next chunk boundary.
    pub async fn begin_cancel(&self, id: &SessionId) -> Option<SessionState> {
        let entry = self.sessions.get(id).map(|e| e.value().clone())?;
        let mut session = entry.lock().await;
        let prior = session.state;
        session.state = SessionState::Cancelled;
        Some(prior)
    }

    /// Drop a session's registry entry.
    pub fn retire(&self, id: &SessionId) {
        if self.sessions.remove(id).is_some() {
            metrics::ACTIVE_SESSIONS.dec();
        }
    }

    /// Current state of a session, if tracked.
    pub async fn state_of(&self, id: &SessionId) -> Option<SessionState> {
        let entry = self.sessions.get(id).map(|e| e.value().clone())?;
        let session = entry.lock().await;
        Some(session.state)
    }

    /// Ids of sessions with no activity since the cutoff.
    ///
    /// Sessions in `Finalizing` are never reported: reassembly is server
    /// work and must not be yanked out from under itself by the sweeper.
    pub async fn idle_sessions(&self, idle_for: time::Duration) -> Vec<SessionId> {
        let cutoff = OffsetDateTime::now_utc() - idle_for;
        let entries: Vec<_> = self
            .sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut idle = Vec::new();
        for (id, entry) in entries {
            let session = entry.lock().await;
            if session.state != SessionState::Finalizing && session.last_activity < cutoff {
                idle.push(id);
            }
        }
        idle
    }

    /// Ids of all tracked sessions.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check whether the registry tracks no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The backing chunk store.
    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }
}
