//! Push subscription rows.

use notifypro_core::subscription::{DeviceInfo, PushKeys, PushTarget, SubscriptionState};
use notifypro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushSubscription {
    pub id: DbId,
    pub account_id: String,
    pub user_id: String,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub p256dh: String,
    #[serde(skip_serializing)]
    pub auth: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device_id: Option<String>,
    pub is_active: bool,
    pub is_expired: bool,
    pub expired_at: Option<Timestamp>,
    pub expired_reason: Option<String>,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PushSubscription {
    pub fn state(&self) -> SubscriptionState {
        SubscriptionState::from_flags(self.is_active, self.is_expired)
    }

    /// Endpoint and keys needed to encrypt and deliver a push message.
    pub fn target(&self) -> PushTarget {
        PushTarget {
            endpoint: self.endpoint.clone(),
            keys: PushKeys {
                p256dh: self.p256dh.clone(),
                auth: self.auth.clone(),
            },
        }
    }
}

/// Input for subscribing a device.
#[derive(Debug, Clone)]
pub struct NewPushSubscription {
    pub account_id: String,
    pub user_id: String,
    pub endpoint: String,
    pub keys: PushKeys,
    pub device: DeviceInfo,
}
