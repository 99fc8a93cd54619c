//! Route definitions for inbound CRM webhooks.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::handlers::webhooks;
use crate::response::WebhookAck;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST /                     -> receive
/// POST /inbound-message      -> inbound_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(webhooks::receive))
        .route("/inbound-message", post(webhooks::inbound_message))
        .layer(CatchPanicLayer::custom(acknowledge_panic))
}

/// A panicking webhook handler still answers 200; the CRM retries
/// anything else.
fn acknowledge_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Webhook handler panicked");
    Json(WebhookAck::failed("Internal error")).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    async fn explode() -> StatusCode {
        panic!("handler bug")
    }

    #[tokio::test]
    async fn panic_is_acknowledged_with_200() {
        let app: Router = Router::new()
            .route("/boom", post(explode))
            .layer(CatchPanicLayer::custom(acknowledge_panic));

        let response = app
            .oneshot(Request::post("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Internal error");
    }
}
