//! Application router and its middleware stack.
//!
//! Two kinds of caller reach this service: the CRM posting webhooks
//! server-to-server, and the browser settings page reading preferences and
//! registering push devices. CORS only matters for the second. The binary
//! and the integration tests both go through [`build_app_router`].

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Correlates a webhook or settings call with the worker logs it causes.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Methods the settings page uses. Nothing in the API deletes or patches.
const CORS_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::PUT];

/// Build the full application [`Router`].
///
/// Layers run outermost first on the way in:
///
/// 1. CORS for the settings page
/// 2. Request ID assignment
/// 3. Request/response tracing, tagged with the request ID
/// 4. Request ID echoed on the response
/// 5. Request timeout
/// 6. Panic recovery
///
/// Webhook routes carry their own panic handler (see
/// [`routes::webhooks::router`]) so the CRM still sees a 200.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        // Liveness and queue depth, outside the versioned API.
        .merge(routes::health::router())
        // Webhooks, settings, subscriptions, notification log.
        .nest("/api/v1", routes::api_routes())
        // Innermost: a panicking handler becomes a 500.
        .layer(CatchPanicLayer::new())
        // CRM calls that hang past the budget get a 408 rather than holding
        // a connection.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Keeps an ID the CRM already sent; otherwise mints a UUID.
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        // Outermost, so preflight requests never reach a handler.
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the browser settings page.
///
/// Panics at startup on an unparsable origin.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        // The settings page shows this ID when a save fails.
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
