//! Notification log vocabulary.
//!
//! Every delivery attempt, and every filtered job, produces exactly one
//! [`NewNotificationLog`] per channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channels::Channel;
use crate::filter::FilterReason;
use crate::request::NotificationRequest;
use crate::types::{AccountId, UserId};

/// Default log retention in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Clicked,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Clicked => "clicked",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log entry ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotificationLog {
    pub account_id: AccountId,
    pub user_id: Option<UserId>,
    pub contact_id: Option<String>,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub is_priority: bool,
    pub was_filtered: bool,
    pub filter_reason: Option<FilterReason>,
    pub message_preview: Option<String>,
}

impl NewNotificationLog {
    fn base(request: &NotificationRequest, channel: Channel, status: DeliveryStatus) -> Self {
        Self {
            account_id: request.account_id.clone(),
            user_id: Some(request.user_id.clone()),
            contact_id: request.contact_id.clone(),
            conversation_id: request.conversation_id.clone(),
            message_id: request.message_id.clone(),
            channel,
            status,
            error: None,
            is_priority: false,
            was_filtered: false,
            filter_reason: None,
            message_preview: Some(request.preview()),
        }
    }

    /// Entry for a job the filter engine suppressed. No channel was contacted.
    pub fn filtered(request: &NotificationRequest, reason: FilterReason) -> Self {
        Self {
            was_filtered: true,
            filter_reason: Some(reason),
            ..Self::base(request, Channel::None, DeliveryStatus::Sent)
        }
    }

    /// Entry for a successful channel delivery.
    pub fn sent(request: &NotificationRequest, channel: Channel, is_priority: bool) -> Self {
        Self {
            is_priority,
            filter_reason: is_priority.then_some(FilterReason::PriorityKeyword),
            ..Self::base(request, channel, DeliveryStatus::Sent)
        }
    }

    /// Entry for a failed channel delivery.
    pub fn failed(
        request: &NotificationRequest,
        channel: Channel,
        is_priority: bool,
        error: impl Into<String>,
    ) -> Self {
        Self {
            is_priority,
            error: Some(error.into()),
            filter_reason: is_priority.then_some(FilterReason::PriorityKeyword),
            ..Self::base(request, channel, DeliveryStatus::Failed)
        }
    }
}
