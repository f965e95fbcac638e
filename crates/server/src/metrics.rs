//! Prometheus metrics for the Hopper server.
//!
//! Exposes metrics for upload sessions, chunk traffic, and reclamation.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no per-file data (no file names or payload content), but
//! they do expose aggregate system usage (chunk counts, bytes, active
//! sessions).
//!
//! **Deployment Requirement**: The `/metrics` endpoint MUST be
//! network-restricted to authorized Prometheus scraper IPs only, enforced at
//! the infrastructure level (firewall, load balancer, or reverse proxy
//! rules). Do NOT expose `/metrics` on public networks.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Session lifecycle metrics
pub static SESSIONS_OPENED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_sessions_opened_total",
        "Total number of upload sessions opened",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_sessions_completed_total",
        "Total number of upload sessions finalized into artifacts",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_CANCELLED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_sessions_cancelled_total",
        "Total number of upload sessions cancelled",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_sessions_failed_total",
        "Total number of upload sessions that failed during reassembly",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_SWEPT: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_sessions_swept_total",
        "Total number of idle upload sessions reclaimed by the sweeper",
    )
    .expect("metric creation failed")
});

// Chunk traffic metrics
pub static CHUNKS_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_chunks_received_total",
        "Total number of chunks received",
    )
    .expect("metric creation failed")
});

pub static BYTES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hopper_bytes_received_total",
        "Total chunk payload bytes received",
    )
    .expect("metric creation failed")
});

// Current state gauges
pub static ACTIVE_SESSIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "hopper_active_sessions",
        "Current number of tracked upload sessions",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// This function is idempotent - subsequent calls after the first are no-ops.
/// This allows safe use in integration tests or when embedding multiple routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(SESSIONS_OPENED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_COMPLETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_CANCELLED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_FAILED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_SWEPT.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CHUNKS_RECEIVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_RECEIVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ACTIVE_SESSIONS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
