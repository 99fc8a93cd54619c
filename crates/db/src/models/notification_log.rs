//! Notification log rows.

use notifypro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notification_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationLogRecord {
    pub id: DbId,
    pub account_id: String,
    pub user_id: Option<String>,
    pub contact_id: Option<String>,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub channel: String,
    pub status: String,
    pub error: Option<String>,
    pub is_priority: bool,
    pub was_filtered: bool,
    pub filter_reason: Option<String>,
    pub message_preview: Option<String>,
    pub created_at: Timestamp,
}

/// Number of log entries for one `(channel, status)` pair.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ChannelStatusCount {
    pub channel: String,
    pub status: String,
    pub count: i64,
}
