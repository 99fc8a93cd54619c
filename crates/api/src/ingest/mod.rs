//! Webhook ingestion: normalization and queue priority.

pub mod normalizer;

pub use normalizer::{NormalizeError, Normalized, SkipReason, WebhookNormalizer};

use notifypro_core::filter::matches_priority_keyword;
use notifypro_core::request::{NotificationRequest, PRIORITY_NORMAL, PRIORITY_URGENT};
use notifypro_events::PreferenceStore;

/// Queue priority for `request`: urgent when the effective preferences name
/// a keyword found in the message.
///
/// Advisory only; the worker re-runs the full filter. A failed lookup
/// yields normal priority instead of failing ingestion.
pub async fn ingestion_priority(
    preferences: &dyn PreferenceStore,
    request: &NotificationRequest,
) -> i16 {
    match preferences
        .find_effective(&request.account_id, &request.user_id)
        .await
    {
        Ok(Some(pref))
            if matches_priority_keyword(&request.message_text, &pref.filters.priority_keywords) =>
        {
            PRIORITY_URGENT
        }
        Ok(_) => PRIORITY_NORMAL,
        Err(e) => {
            tracing::warn!(
                account_id = %request.account_id,
                error = %e,
                "Preference lookup failed at ingestion, using normal priority",
            );
            PRIORITY_NORMAL
        }
    }
}
