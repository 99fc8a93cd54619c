//! Route definitions for browser push subscriptions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::subscriptions as h;
use crate::state::AppState;

/// Routes mounted at `/subscriptions`.
///
/// ```text
/// GET  /vapid-public-key     -> vapid_public_key
/// POST /subscribe            -> subscribe
/// POST /unsubscribe          -> unsubscribe
/// GET  /status               -> status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vapid-public-key", get(h::vapid_public_key))
        .route("/subscribe", post(h::subscribe))
        .route("/unsubscribe", post(h::unsubscribe))
        .route("/status", get(h::status))
}
