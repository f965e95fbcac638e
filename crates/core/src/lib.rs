//! Core domain types for the Hopper chunked-upload coordinator.
//!
//! This crate holds the pieces shared across the workspace:
//! - Upload session types and lifecycle ([`session`])
//! - Configuration types ([`config`])
//! - The domain error type ([`error`])

pub mod config;
pub mod error;
pub mod session;

pub use error::{Error, Result};
pub use session::{SessionId, SessionSnapshot, SessionState, UploadSession};

/// Default maximum chunk payload size (16 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Default maximum chunk count per session.
pub const DEFAULT_MAX_CHUNKS_PER_SESSION: u32 = 10_000;
