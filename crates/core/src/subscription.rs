//! Push subscription vocabulary and state machine.
//!
//! A subscription moves between three states:
//!
//! ```text
//! active --(superseded / unsubscribe)--> inactive
//! active --(push backend 404/410)------> expired
//! inactive | expired --(subscribe)-----> active
//! ```
//!
//! Expired subscriptions never come back except through a fresh subscribe.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Push service status meaning the subscription was revoked.
pub const STATUS_GONE: u16 = 410;

/// Push service status meaning the endpoint does not exist.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Browser-provided encryption keys (base64url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Where and how to deliver a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTarget {
    pub endpoint: String,
    pub keys: PushKeys,
}

/// Device fingerprint reported by the subscribing client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device_id: Option<String>,
}

/// Why a subscription was marked expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    SubscriptionExpired,
    EndpointNotFound,
}

impl ExpiryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryReason::SubscriptionExpired => "subscription_expired",
            ExpiryReason::EndpointNotFound => "endpoint_not_found",
        }
    }

    /// Classify a push service status. Only 410 and 404 expire a subscription.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            STATUS_GONE => Some(ExpiryReason::SubscriptionExpired),
            STATUS_NOT_FOUND => Some(ExpiryReason::EndpointNotFound),
            _ => None,
        }
    }
}

impl fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Inactive,
    Expired,
}

impl SubscriptionState {
    pub fn from_flags(is_active: bool, is_expired: bool) -> Self {
        match (is_active, is_expired) {
            (_, true) => SubscriptionState::Expired,
            (true, false) => SubscriptionState::Active,
            (false, false) => SubscriptionState::Inactive,
        }
    }
}

/// Subscription summary for one account + user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub has_active_subscription: bool,
    pub has_expired_subscription: bool,
}

impl SubscriptionStatus {
    /// Fold the states of every subscription a user holds.
    pub fn from_states(states: impl IntoIterator<Item = SubscriptionState>) -> Self {
        states.into_iter().fold(Self::default(), |mut acc, state| {
            match state {
                SubscriptionState::Active => acc.has_active_subscription = true,
                SubscriptionState::Expired => acc.has_expired_subscription = true,
                SubscriptionState::Inactive => {}
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_and_not_found_expire() {
        assert_eq!(ExpiryReason::from_status(410), Some(ExpiryReason::SubscriptionExpired));
        assert_eq!(ExpiryReason::from_status(404), Some(ExpiryReason::EndpointNotFound));
        assert_eq!(ExpiryReason::from_status(500), None);
        assert_eq!(ExpiryReason::from_status(429), None);
    }

    #[test]
    fn expired_flag_dominates() {
        assert_eq!(SubscriptionState::from_flags(true, true), SubscriptionState::Expired);
        assert_eq!(SubscriptionState::from_flags(false, true), SubscriptionState::Expired);
        assert_eq!(SubscriptionState::from_flags(true, false), SubscriptionState::Active);
        assert_eq!(SubscriptionState::from_flags(false, false), SubscriptionState::Inactive);
    }

    #[test]
    fn status_folds_states() {
        let status = SubscriptionStatus::from_states([
            SubscriptionState::Inactive,
            SubscriptionState::Expired,
        ]);
        assert!(!status.has_active_subscription);
        assert!(status.has_expired_subscription);

        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["hasExpiredSubscription"], true);
    }
}
