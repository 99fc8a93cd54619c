//! Handlers for inbound CRM webhooks.
//!
//! Every response is HTTP 200. The CRM retries anything else, and a retry
//! storm is worse than a dropped event; failures are logged and reported in
//! the body instead.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use notifypro_core::request::EventKind;
use serde_json::Value;

use crate::ingest::{ingestion_priority, NormalizeError, Normalized, SkipReason};
use crate::response::WebhookAck;
use crate::state::AppState;

/// POST /api/v1/webhooks
///
/// Generic endpoint; the event kind comes from the payload's `type`.
/// The body is read as raw bytes so a malformed payload is still
/// acknowledged rather than rejected by the JSON extractor.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> Json<WebhookAck> {
    let normalized = match parse(&body) {
        Ok(event) => state.normalizer.normalize(&event).await,
        Err(e) => Err(e),
    };
    Json(accept(&state, normalized).await)
}

/// POST /api/v1/webhooks/inbound-message
pub async fn inbound_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<WebhookAck> {
    let normalized = match parse(&body) {
        Ok(event) => {
            state
                .normalizer
                .normalize_as(EventKind::InboundMessage, &event)
                .await
        }
        Err(e) => Err(e),
    };
    Json(accept(&state, normalized).await)
}

fn parse(body: &[u8]) -> Result<Value, NormalizeError> {
    Ok(serde_json::from_slice(body)?)
}

async fn accept(state: &AppState, normalized: Result<Normalized, NormalizeError>) -> WebhookAck {
    let request = match normalized {
        Ok(Normalized::Request(request)) => request,
        Ok(Normalized::Skipped(SkipReason::Unassigned)) => {
            return WebhookAck::ok("Skipped: no assigned user");
        }
        Ok(Normalized::Skipped(SkipReason::Unsupported(event_type))) => {
            tracing::debug!(event_type = %event_type, "Ignoring unsupported webhook");
            return WebhookAck::ok(format!("Ignored unsupported event type '{event_type}'"));
        }
        Err(e) => {
            tracing::warn!(error = %e, "Webhook could not be normalized");
            return WebhookAck::failed(e.to_string());
        }
    };

    let priority = ingestion_priority(state.preferences.as_ref(), &request).await;

    match state.queue.enqueue(&request, priority).await {
        Ok(job_id) => {
            tracing::info!(
                job_id,
                account_id = %request.account_id,
                user_id = %request.user_id,
                event = %request.event,
                priority,
                "Notification queued",
            );
            WebhookAck::ok("Notification queued")
        }
        Err(e) => {
            tracing::error!(
                account_id = %request.account_id,
                error = %e,
                "Failed to enqueue notification",
            );
            WebhookAck::failed(e.to_string())
        }
    }
}
