//! Idle-session sweep tests.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use common::fixtures::patterned_chunk;
use hopper_core::SessionId;
use hopper_server::sweep::sweep_idle;

#[tokio::test]
async fn test_sweep_reclaims_idle_sessions() {
    let server = TestServer::new().await;

    server
        .upload_chunk("abandoned.bin", 0, patterned_chunk(0, 64))
        .await;
    assert!(server.chunk_dir("abandoned.bin").exists());

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let swept = sweep_idle(
        &server.state.registry,
        &server.state.cancel,
        time::Duration::ZERO,
    )
    .await;
    assert_eq!(swept, 1);
    assert!(!server.chunk_dir("abandoned.bin").exists());

    // A swept session behaves like a cancelled one.
    let (status, _) = server.finalize("abandoned.bin", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sweep_spares_recently_active_sessions() {
    let server = TestServer::new().await;

    server
        .upload_chunk("busy.bin", 0, patterned_chunk(0, 64))
        .await;

    let swept = sweep_idle(
        &server.state.registry,
        &server.state.cancel,
        time::Duration::hours(1),
    )
    .await;
    assert_eq!(swept, 0);

    let (status, _) = server.finalize("busy.bin", 1).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sweep_spares_finalizing_sessions() {
    let server = TestServer::new().await;
    let id = SessionId::parse("assembling.bin").unwrap();

    server
        .upload_chunk("assembling.bin", 0, patterned_chunk(0, 64))
        .await;
    let snapshot = server.state.registry.begin_finalize(&id, 1).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let swept = sweep_idle(
        &server.state.registry,
        &server.state.cancel,
        time::Duration::ZERO,
    )
    .await;
    assert_eq!(swept, 0);

    // Reassembly proceeds untouched.
    let info = server.state.reassembler.run(snapshot).await.unwrap();
    assert_eq!(info.size_bytes, 64);
    assert!(server.artifact_path("assembling.bin").exists());
}

#[tokio::test]
async fn test_drain_cancels_all_sessions() {
    let server = TestServer::new().await;

    for name in ["one.bin", "two.bin", "three.bin"] {
        server.upload_chunk(name, 0, patterned_chunk(0, 32)).await;
    }

    let drained = server.state.cancel.drain().await;
    assert_eq!(drained, 3);
    assert!(server.state.registry.is_empty());
    for name in ["one.bin", "two.bin", "three.bin"] {
        assert!(!server.chunk_dir(name).exists());
    }
}
