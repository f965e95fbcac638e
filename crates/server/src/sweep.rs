//! Background reclamation of idle upload sessions.

use crate::cancel::CancellationHandler;
use crate::metrics;
use crate::registry::SessionRegistry;
use hopper_core::config::SweepConfig;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Cancel every session idle for longer than `idle_for`.
///
/// Sessions in the middle of reassembly are never touched. Returns the
/// number of sessions reclaimed.
pub async fn sweep_idle(
    registry: &SessionRegistry,
    cancel: &CancellationHandler,
    idle_for: time::Duration,
) -> usize {
    let idle = registry.idle_sessions(idle_for).await;
    let mut swept = 0;
    for id in idle {
        match cancel.cancel(&id).await {
            Ok(()) => {
                metrics::SESSIONS_SWEPT.inc();
                info!(session = %id, "reclaimed idle upload session");
                swept += 1;
            }
            Err(e) => {
                warn!(session = %id, error = %e, "failed to reclaim idle session");
            }
        }
    }
    swept
}

/// Spawn the periodic idle-session sweeper.
///
/// The caller is responsible for only spawning when the sweep is enabled
/// and the config validated.
pub fn spawn_sweep_task(
    registry: Arc<SessionRegistry>,
    cancel: Arc<CancellationHandler>,
    config: SweepConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = config.interval_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            "idle-session sweeper started"
        );

        loop {
            ticker.tick().await;
            let swept = sweep_idle(&registry, &cancel, config.idle_timeout()).await;
            if swept > 0 {
                info!(swept, "sweep pass reclaimed idle sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hopper_core::{SessionId, SessionState};
    use hopper_store::{ChunkStore, FilesystemStore};

    async fn setup() -> (
        tempfile::TempDir,
        Arc<SessionRegistry>,
        Arc<CancellationHandler>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ChunkStore> =
            Arc::new(FilesystemStore::new(dir.path()).await.unwrap());
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let cancel = Arc::new(CancellationHandler::new(registry.clone(), store));
        (dir, registry, cancel)
    }

    fn sid(name: &str) -> SessionId {
        SessionId::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_reclaims_idle_sessions() {
        let (dir, registry, cancel) = setup().await;

        registry
            .record_chunk(&sid("stale.bin"), 0, Bytes::from("aa"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let swept = sweep_idle(&registry, &cancel, time::Duration::ZERO).await;
        assert_eq!(swept, 1);
        assert!(registry.is_empty());
        assert!(!dir.path().join("chunks/stale.bin").exists());
    }

    #[tokio::test]
    async fn test_sweep_spares_active_and_finalizing() {
        let (_dir, registry, cancel) = setup().await;

        registry
            .record_chunk(&sid("fresh.bin"), 0, Bytes::from("aa"))
            .await
            .unwrap();
        registry
            .record_chunk(&sid("assembling.bin"), 0, Bytes::from("bb"))
            .await
            .unwrap();
        registry
            .begin_finalize(&sid("assembling.bin"), 1)
            .await
            .unwrap();

        // A long idle window spares the fresh session; finalizing sessions
        // are exempt regardless of the window.
        let swept = sweep_idle(&registry, &cancel, time::Duration::hours(1)).await;
        assert_eq!(swept, 0);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let swept = sweep_idle(&registry, &cancel, time::Duration::ZERO).await;
        assert_eq!(swept, 1);
        assert_eq!(
            registry.state_of(&sid("assembling.bin")).await,
            Some(SessionState::Finalizing)
        );
    }
}
