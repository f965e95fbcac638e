//! Application state shared across handlers.

use crate::cancel::CancellationHandler;
use crate::reassemble::Reassembler;
use crate::registry::SessionRegistry;
use hopper_core::config::AppConfig;
use hopper_store::ChunkStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Chunk storage backend.
    pub store: Arc<dyn ChunkStore>,
    /// Upload session registry.
    pub registry: Arc<SessionRegistry>,
    /// Chunk reassembler.
    pub reassembler: Arc<Reassembler>,
    /// Session cancellation handler.
    pub cancel: Arc<CancellationHandler>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if the sweep configuration is invalid.
    pub fn new(config: AppConfig, store: Arc<dyn ChunkStore>) -> Self {
        if let Err(error) = config.sweep.validate() {
            panic!("Invalid sweep configuration: {error}");
        }

        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let reassembler = Arc::new(Reassembler::new(registry.clone(), store.clone()));
        let cancel = Arc::new(CancellationHandler::new(registry.clone(), store.clone()));

        Self {
            config: Arc::new(config),
            store,
            registry,
            reassembler,
            cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopper_core::config::AppConfig;
    use hopper_store::FilesystemStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn state_builds_from_testing_config() {
        let temp = tempdir().unwrap();
        let store: Arc<dyn ChunkStore> =
            Arc::new(FilesystemStore::new(temp.path()).await.unwrap());
        let state = AppState::new(AppConfig::for_testing(), store);
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    #[should_panic(expected = "Invalid sweep configuration")]
    async fn state_rejects_zero_sweep_interval() {
        let temp = tempdir().unwrap();
        let store: Arc<dyn ChunkStore> =
            Arc::new(FilesystemStore::new(temp.path()).await.unwrap());

        let mut config = AppConfig::for_testing();
        config.sweep.enabled = true;
        config.sweep.interval_secs = 0;
        AppState::new(config, store);
    }
}
