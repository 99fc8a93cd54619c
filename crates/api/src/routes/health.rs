use axum::extract::State;
use axum::{routing::get, Json, Router};
use notifypro_events::queue::QueueCounts;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the job queue answered a depth query.
    pub queue_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueCounts>,
}

/// GET /health -- returns service and queue health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue = match state.queue.counts().await {
        Ok(counts) => Some(counts),
        Err(e) => {
            tracing::warn!(error = %e, "Queue health check failed");
            None
        }
    };
    let queue_healthy = queue.is_some();

    Json(HealthResponse {
        status: if queue_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        queue_healthy,
        queue,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
