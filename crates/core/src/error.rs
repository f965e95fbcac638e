//! Error types for the core domain.

use crate::session::SessionState;
use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("no upload session for {0}")]
    SessionNotFound(String),

    #[error("session {id} is {state}")]
    InvalidState { id: String, state: SessionState },

    #[error("session {0} is already finalizing")]
    AlreadyFinalizing(String),

    #[error("incomplete upload: received {received} of {expected} chunks")]
    Incomplete {
        expected: u32,
        received: u32,
        /// Lowest index in `0..expected` with no stored payload, if any.
        /// `None` means every expected index arrived but stray extra
        /// indices were recorded beyond the declared total.
        first_missing: Option<u32>,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
