//! Well-known notification channel names.
//!
//! These must match the values stored in the `notification_logs.channel`
//! column and referenced by the dispatcher and the API handlers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Browser push notification delivered via the Web Push protocol.
pub const CHANNEL_PUSH: &str = "push";

/// Email notification delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// Chat notification delivered to a Slack incoming webhook.
pub const CHANNEL_SLACK: &str = "slack";

/// Placeholder channel for log entries where no channel was contacted
/// (the notification was filtered out).
pub const CHANNEL_NONE: &str = "none";

/// A notification delivery mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Push,
    Email,
    Slack,
    /// No channel was attempted.
    None,
}

impl Channel {
    /// The three real delivery channels, in fan-out order.
    pub const DELIVERABLE: [Channel; 3] = [Channel::Push, Channel::Email, Channel::Slack];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => CHANNEL_PUSH,
            Channel::Email => CHANNEL_EMAIL,
            Channel::Slack => CHANNEL_SLACK,
            Channel::None => CHANNEL_NONE,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CHANNEL_PUSH => Ok(Channel::Push),
            CHANNEL_EMAIL => Ok(Channel::Email),
            CHANNEL_SLACK => Ok(Channel::Slack),
            CHANNEL_NONE => Ok(Channel::None),
            other => Err(format!("Unknown channel '{other}'")),
        }
    }
}
