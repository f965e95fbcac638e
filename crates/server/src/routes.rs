//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Slack on top of the configured chunk size so the handler, not the body
/// limit layer, reports oversized payloads with the standard error body.
const CHUNK_BODY_SLACK: usize = 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Idempotent; keeps embedded routers and tests working without a
    // separate registration step.
    crate::metrics::register_metrics();

    let mut router = Router::new()
        // Data plane
        .route("/upload", post(handlers::upload_chunk))
        // Control plane
        .route("/finalize-upload", post(handlers::finalize_upload))
        .route("/cancel-upload", post(handlers::cancel_upload))
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check));

    // Conditionally add metrics endpoint based on config.
    // SECURITY: When enabled, this endpoint MUST be network-restricted
    // to authorized Prometheus scraper IPs only.
    // See crate::metrics module documentation for details.
    if state.config.server.metrics_enabled {
        router = router.merge(Router::new().route("/metrics", get(metrics_handler)));
    }

    let body_limit = usize::try_from(state.config.server.max_chunk_size)
        .unwrap_or(usize::MAX - CHUNK_BODY_SLACK)
        + CHUNK_BODY_SLACK;

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
