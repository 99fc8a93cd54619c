//! Canonical notification job payload.
//!
//! Inbound webhooks of every shape are reduced to a [`NotificationRequest`]
//! before they reach the job queue. The dispatcher only ever sees this type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, UserId};

/// Queue job name for notification dispatch.
pub const JOB_NAME: &str = "process-notification";

/// Priority for jobs whose message matched a priority keyword.
pub const PRIORITY_URGENT: i16 = 10;

/// Priority for ordinary traffic.
pub const PRIORITY_NORMAL: i16 = 1;

/// Accepted priority range (inclusive).
pub const MIN_PRIORITY: i16 = 0;
pub const MAX_PRIORITY: i16 = 10;

/// Contact name used when no source field supplies one.
pub const UNKNOWN_CONTACT: &str = "Unknown Contact";

/// Number of characters kept in log message previews.
pub const PREVIEW_CHARS: usize = 100;

/// Default base for conversation deep links.
pub const DEFAULT_CONVERSATION_URL_BASE: &str = "https://app.gohighlevel.com";

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Known(UserId),
    /// Nobody is assigned; the event must not produce a notification.
    Unassigned,
}

impl Recipient {
    /// Blank or missing ids are unassigned.
    pub fn from_optional(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Recipient::Known(id.to_string()),
            _ => Recipient::Unassigned,
        }
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Task lifecycle action carried into the notification body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    Created,
    Completed,
    Deleted,
}

impl TaskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Created => "created",
            TaskAction::Completed => "completed",
            TaskAction::Deleted => "deleted",
        }
    }
}

/// Originating event type of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    InboundMessage,
    TaskCreate,
    TaskComplete,
    TaskDelete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::InboundMessage => "InboundMessage",
            EventKind::TaskCreate => "TaskCreate",
            EventKind::TaskComplete => "TaskComplete",
            EventKind::TaskDelete => "TaskDelete",
        }
    }

    /// Map a webhook `type` value to a supported kind.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "InboundMessage" => Some(EventKind::InboundMessage),
            "TaskCreate" => Some(EventKind::TaskCreate),
            "TaskComplete" => Some(EventKind::TaskComplete),
            "TaskDelete" => Some(EventKind::TaskDelete),
            _ => None,
        }
    }

    pub fn task_action(&self) -> Option<TaskAction> {
        match self {
            EventKind::InboundMessage => None,
            EventKind::TaskCreate => Some(TaskAction::Created),
            EventKind::TaskComplete => Some(TaskAction::Completed),
            EventKind::TaskDelete => Some(TaskAction::Deleted),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NotificationRequest
// ---------------------------------------------------------------------------

/// A normalized, queue-resident notification job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub contact_id: Option<String>,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub message_text: String,
    pub contact_name: String,
    pub event: EventKind,
}

impl NotificationRequest {
    /// Title shown on every channel.
    pub fn title(&self) -> String {
        match self.event.task_action() {
            Some(action) => format!("Task {} for {}", action.as_str(), self.contact_name),
            None => format!("New message from {}", self.contact_name),
        }
    }

    pub fn preview(&self) -> String {
        message_preview(&self.message_text)
    }
}

/// Body text for a task lifecycle event.
pub fn task_body(action: TaskAction, title: &str) -> String {
    let verb = match action {
        TaskAction::Created => "Task created",
        TaskAction::Completed => "Task completed",
        TaskAction::Deleted => "Task deleted",
    };
    format!("{verb}: {title}")
}

/// First [`PREVIEW_CHARS`] characters of `text`.
pub fn message_preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Deep link to a conversation in the CRM web app.
///
/// Without a conversation id the link points at the account's inbox.
pub fn conversation_url(base: &str, account_id: &str, conversation_id: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    match conversation_id {
        Some(conv) if !conv.is_empty() => {
            format!("{base}/v2/location/{account_id}/conversations/{conv}")
        }
        _ => format!("{base}/v2/location/{account_id}/conversations"),
    }
}

/// Clamp a requested priority into the accepted range.
pub fn clamp_priority(priority: i16) -> i16 {
    priority.clamp(MIN_PRIORITY, MAX_PRIORITY)
}
