pub mod health;
pub mod notifications;
pub mod settings;
pub mod subscriptions;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /webhooks                                 generic CRM webhook (POST)
/// /webhooks/inbound-message                 inbound message webhook (POST)
///
/// /subscriptions/vapid-public-key           browser push public key (GET)
/// /subscriptions/subscribe                  register device (POST)
/// /subscriptions/unsubscribe                deactivate device (POST)
/// /subscriptions/status                     per-user device status (GET)
///
/// /settings                                 get-or-create, replace (GET, PUT)
///
/// /notifications                            log entries (GET)
/// /notifications/stats                      counts per channel and status (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Inbound CRM events.
        .nest("/webhooks", webhooks::router())
        // Browser push device lifecycle.
        .nest("/subscriptions", subscriptions::router())
        // Per-account / per-user preferences.
        .nest("/settings", settings::router())
        // Delivery audit.
        .nest("/notifications", notifications::router())
}
