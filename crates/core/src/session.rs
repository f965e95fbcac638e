//! Upload session types and lifecycle.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use time::OffsetDateTime;

/// Maximum accepted file name length in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Identifier for an upload session, derived from the client-supplied
/// file name. One session exists per file name at any given time, so
/// collisions are namespaced by construction.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl<'de> Deserialize<'de> for SessionId {
    /// Deserializes through [`SessionId::parse`] so an id arriving on the
    /// wire carries the same single-path-component guarantee as one built
    /// in process.
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl SessionId {
    /// Parse and validate a file name as a session identifier.
    ///
    /// Accepts only `[A-Za-z0-9._-]`, rejects empty and oversized names,
    /// and names starting with `.` (reserved for temp files in storage).
    /// This constrains ids to safe single path components.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidFileName("file name is empty".to_string()));
        }
        if s.len() > MAX_FILE_NAME_LEN {
            return Err(Error::InvalidFileName(format!(
                "file name exceeds {MAX_FILE_NAME_LEN} bytes"
            )));
        }
        if s.starts_with('.') {
            return Err(Error::InvalidFileName(format!(
                "file name must not start with '.': {s}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(Error::InvalidFileName(format!(
                "file name contains unsupported characters: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the underlying file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upload session state.
///
/// Transitions are monotonic: `Open -> Finalizing -> {Completed, Failed}`,
/// with `Cancelled` reachable from any non-terminal state. Nothing leaves
/// a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session is accepting chunks.
    Open,
    /// Reassembly is in progress; chunk arrivals are rejected.
    Finalizing,
    /// Artifact was published.
    Completed,
    /// Session was cancelled and cleaned up.
    Cancelled,
    /// Reassembly failed; chunks may be partially cleaned up.
    Failed,
}

impl SessionState {
    /// Check if the session can still receive chunks.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Bookkeeping for one file's in-progress chunked upload.
#[derive(Clone, Debug)]
pub struct UploadSession {
    /// Session identifier (the file name).
    pub id: SessionId,
    /// Declared chunk count, fixed when finalize begins.
    pub total_chunks: Option<u32>,
    /// Indices with a stored payload. Re-upload of an index replaces the
    /// payload rather than reserving a second slot.
    pub received: BTreeSet<u32>,
    /// Current lifecycle state.
    pub state: SessionState,
    /// When the session was created.
    pub created_at: OffsetDateTime,
    /// When a chunk last arrived or finalize began; drives the idle sweep.
    pub last_activity: OffsetDateTime,
}

impl UploadSession {
    /// Create a new open session.
    pub fn new(id: SessionId) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            total_chunks: None,
            received: BTreeSet::new(),
            state: SessionState::Open,
            created_at: now,
            last_activity: now,
        }
    }

    /// Record activity for idle accounting.
    pub fn touch(&mut self) {
        self.last_activity = OffsetDateTime::now_utc();
    }

    /// Lowest index in `0..total` without a stored payload.
    pub fn first_missing(&self, total: u32) -> Option<u32> {
        (0..total).find(|index| !self.received.contains(index))
    }

    /// Check that exactly the indices `0..total` have been received.
    pub fn is_complete(&self, total: u32) -> bool {
        self.received.len() == total as usize && self.first_missing(total).is_none()
    }
}

/// Immutable view of a session handed to the reassembler after the
/// `Open -> Finalizing` transition wins.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: SessionId,
    /// Declared chunk count.
    pub total_chunks: u32,
}
