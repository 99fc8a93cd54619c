//! Route definitions for the notification log.

use axum::routing::get;
use axum::Router;

use crate::handlers::notifications as h;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET /          -> list
/// GET /stats     -> stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(h::list))
        .route("/stats", get(h::stats))
}
