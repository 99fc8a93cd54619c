use axum::routing::get;
use axum::Router;

use crate::handlers::settings as h;
use crate::state::AppState;

/// Routes mounted at `/settings`.
///
/// ```text
/// GET /    -> get_settings
/// PUT /    -> update_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(h::get_settings).put(h::update_settings))
}
