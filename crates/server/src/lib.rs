//! HTTP server coordinating chunked file uploads.
//!
//! Clients stream chunks of a file in any order, then finalize to have the
//! server reassemble and publish the complete artifact, or cancel to discard
//! everything. Sessions are keyed by file name and tracked entirely in
//! memory; chunk payloads live in the storage backend.

pub mod cancel;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod reassemble;
pub mod registry;
pub mod routes;
pub mod state;
pub mod sweep;

pub use error::{ApiError, ApiResult};
pub use reassemble::{ArtifactInfo, Reassembler};
pub use registry::SessionRegistry;
pub use routes::create_router;
pub use state::AppState;
