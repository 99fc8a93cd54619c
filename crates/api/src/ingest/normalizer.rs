//! Maps raw CRM webhook payloads to [`NotificationRequest`]s.
//!
//! Message events resolve their recipient through the [`ContactDirectory`];
//! task events carry it in `assignedTo`. An event without a recipient is
//! skipped, never delivered to a fallback user.

use std::sync::Arc;

use notifypro_core::request::{
    task_body, EventKind, NotificationRequest, Recipient, UNKNOWN_CONTACT,
};
use serde::Deserialize;
use serde_json::Value;

use crate::contacts::{ContactDirectory, ContactLookupError};

/// Result of normalizing one webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Request(NotificationRequest),
    Skipped(SkipReason),
}

/// Why an event produced no notification. Neither case is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Nobody is assigned to the contact or task.
    Unassigned,
    /// The event type is not one we notify on.
    Unsupported(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Webhook payload is missing `{0}`")]
    MissingField(&'static str),

    #[error("Webhook payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Lookup(#[from] ContactLookupError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InboundMessageEvent {
    location_id: Option<String>,
    contact_id: Option<String>,
    conversation_id: Option<String>,
    message_id: Option<String>,
    body: Option<Value>,
    message: Option<Value>,
    text: Option<Value>,
    contact_name: Option<String>,
    contact: Option<ContactRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactRef {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskEvent {
    location_id: Option<String>,
    assigned_to: Option<String>,
    title: Option<String>,
    contact_id: Option<String>,
    contact_name: Option<String>,
}

/// First non-blank string among `candidates`.
fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a Value>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct WebhookNormalizer {
    contacts: Arc<dyn ContactDirectory>,
}

impl WebhookNormalizer {
    pub fn new(contacts: Arc<dyn ContactDirectory>) -> Self {
        Self { contacts }
    }

    /// Normalize an event, dispatching on its `type` field.
    pub async fn normalize(&self, event: &Value) -> Result<Normalized, NormalizeError> {
        let event_type = event.get("type").and_then(Value::as_str).unwrap_or_default();
        match EventKind::from_event_type(event_type) {
            Some(kind) => self.normalize_as(kind, event).await,
            None => Ok(Normalized::Skipped(SkipReason::Unsupported(
                event_type.to_string(),
            ))),
        }
    }

    /// Normalize an event whose kind is already known (e.g. from the route).
    pub async fn normalize_as(
        &self,
        kind: EventKind,
        event: &Value,
    ) -> Result<Normalized, NormalizeError> {
        match kind {
            EventKind::InboundMessage => self.inbound_message(event).await,
            _ => task(kind, event),
        }
    }

    async fn inbound_message(&self, event: &Value) -> Result<Normalized, NormalizeError> {
        let raw = InboundMessageEvent::deserialize(event)?;
        let account_id =
            non_blank(raw.location_id).ok_or(NormalizeError::MissingField("locationId"))?;

        let assignee = match non_blank(raw.contact_id.clone()) {
            Some(contact_id) => self.contacts.assigned_user(&account_id, &contact_id).await?,
            None => None,
        };
        let Recipient::Known(user_id) = Recipient::from_optional(assignee.as_deref()) else {
            tracing::info!(
                account_id = %account_id,
                contact_id = ?raw.contact_id,
                "Contact has no assignee, skipping notification",
            );
            return Ok(Normalized::Skipped(SkipReason::Unassigned));
        };

        let message_text =
            first_text([raw.body.as_ref(), raw.message.as_ref(), raw.text.as_ref()])
                .unwrap_or_default();
        let contact_name = non_blank(raw.contact_name)
            .or_else(|| non_blank(raw.contact.and_then(|c| c.name)))
            .unwrap_or_else(|| UNKNOWN_CONTACT.to_string());

        Ok(Normalized::Request(NotificationRequest {
            account_id,
            user_id,
            contact_id: non_blank(raw.contact_id),
            conversation_id: non_blank(raw.conversation_id),
            message_id: non_blank(raw.message_id),
            message_text,
            contact_name,
            event: EventKind::InboundMessage,
        }))
    }
}

fn task(kind: EventKind, event: &Value) -> Result<Normalized, NormalizeError> {
    let Some(action) = kind.task_action() else {
        return Ok(Normalized::Skipped(SkipReason::Unsupported(
            kind.as_str().to_string(),
        )));
    };

    let raw = TaskEvent::deserialize(event)?;
    let account_id =
        non_blank(raw.location_id).ok_or(NormalizeError::MissingField("locationId"))?;

    let Recipient::Known(user_id) = Recipient::from_optional(raw.assigned_to.as_deref()) else {
        tracing::info!(account_id = %account_id, event = %kind, "Task has no assignee, skipping notification");
        return Ok(Normalized::Skipped(SkipReason::Unassigned));
    };

    let title = non_blank(raw.title).unwrap_or_else(|| "Untitled task".to_string());

    Ok(Normalized::Request(NotificationRequest {
        account_id,
        user_id,
        contact_id: non_blank(raw.contact_id),
        conversation_id: None,
        message_id: None,
        message_text: task_body(action, &title),
        contact_name: non_blank(raw.contact_name).unwrap_or_else(|| UNKNOWN_CONTACT.to_string()),
        event: kind,
    }))
}
