//! Chunk and artifact storage for Hopper.
//!
//! This crate provides:
//! - Per-session chunk payload storage with atomic writes
//! - Streaming artifact assembly that publishes only on `finish`
//! - Backend: local filesystem

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemStore;
pub use error::{StoreError, StoreResult};
pub use traits::{ArtifactSink, ChunkStore};

use hopper_core::config::StorageConfig;
use std::sync::Arc;

/// Create a chunk store from configuration.
pub async fn from_config(config: &StorageConfig) -> StoreResult<Arc<dyn ChunkStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let store = FilesystemStore::new(path).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hopper_core::SessionId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_filesystem_ok() {
        let temp = tempdir().unwrap();
        let config = StorageConfig::Filesystem {
            path: temp.path().join("store"),
        };

        let store = from_config(&config).await.unwrap();
        let session = SessionId::parse("hello.txt").unwrap();
        store
            .put_chunk(&session, 0, Bytes::from_static(b"hi"))
            .await
            .unwrap();
        assert_eq!(
            store.get_chunk(&session, 0).await.unwrap(),
            Bytes::from_static(b"hi")
        );
        store.health_check().await.unwrap();
    }
}
