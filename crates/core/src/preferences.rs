//! Per-account notification preferences.
//!
//! A [`NotificationPreference`] is fully defaulted at construction time;
//! every nested block carries `#[serde(default)]` so partially-populated
//! documents (from the settings UI or older rows) deserialize into a
//! complete value instead of leaving optional holes.

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::channels::Channel;
use crate::error::CoreError;
use crate::types::{AccountId, UserId};

/// Maximum number of priority keywords per preference record.
pub const MAX_PRIORITY_KEYWORDS: usize = 50;

/// Format of business-hours boundaries.
pub const TIME_FORMAT: &str = "%H:%M";

const DEFAULT_START: &str = "09:00";
const DEFAULT_END: &str = "17:00";
const DEFAULT_TIMEZONE: &str = "America/New_York";

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushChannelSettings {
    pub enabled: bool,
    pub sound: bool,
}

impl Default for PushChannelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailChannelSettings {
    pub enabled: bool,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackChannelSettings {
    pub enabled: bool,
    pub webhook_url: Option<String>,
}

/// Per-channel enablement and delivery targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    pub push: PushChannelSettings,
    pub email: EmailChannelSettings,
    pub slack: SlackChannelSettings,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Day of the week as stored in preference documents (`"monday"` ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for BusinessDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => BusinessDay::Monday,
            Weekday::Tue => BusinessDay::Tuesday,
            Weekday::Wed => BusinessDay::Wednesday,
            Weekday::Thu => BusinessDay::Thursday,
            Weekday::Fri => BusinessDay::Friday,
            Weekday::Sat => BusinessDay::Saturday,
            Weekday::Sun => BusinessDay::Sunday,
        }
    }
}

/// Business-hours window evaluated in an IANA timezone.
///
/// `start` and `end` are `HH:MM` strings. When `end < start` the window
/// crosses midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessHours {
    pub start: String,
    pub end: String,
    pub timezone: String,
    pub days: Vec<BusinessDay>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            end: DEFAULT_END.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            days: vec![
                BusinessDay::Monday,
                BusinessDay::Tuesday,
                BusinessDay::Wednesday,
                BusinessDay::Thursday,
                BusinessDay::Friday,
            ],
        }
    }
}

impl BusinessHours {
    /// Parse the timezone name.
    pub fn tz(&self) -> Result<Tz, CoreError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            CoreError::Validation(format!(
                "'{}' is not a valid IANA timezone",
                self.timezone
            ))
        })
    }

    /// Parse `start` and `end` into times of day.
    pub fn bounds(&self) -> Result<(NaiveTime, NaiveTime), CoreError> {
        let parse = |label: &str, value: &str| {
            NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
                CoreError::Validation(format!("Business hours {label} '{value}' must be HH:MM"))
            })
        };
        Ok((parse("start", &self.start)?, parse("end", &self.end)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSettings {
    pub business_hours_only: bool,
    pub business_hours: BusinessHours,
    /// Ordered list of substrings that force delivery.
    pub priority_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Suppress real delivery while the account is testing its configuration.
    pub test_mode: bool,
}

// ---------------------------------------------------------------------------
// NotificationPreference
// ---------------------------------------------------------------------------

/// Notification preferences for an account, optionally scoped to a user.
///
/// `user_id = None` is the account-wide default record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    pub account_id: AccountId,
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub channels: ChannelSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub features: FeatureFlags,
}

impl NotificationPreference {
    /// Build a preference record with every field at its default.
    pub fn new(account_id: impl Into<AccountId>, user_id: Option<UserId>) -> Self {
        Self {
            account_id: account_id.into(),
            user_id,
            channels: ChannelSettings::default(),
            filters: FilterSettings::default(),
            features: FeatureFlags::default(),
        }
    }

    /// Whether at least one of push, email, or slack is switched on.
    pub fn has_enabled_channels(&self) -> bool {
        self.channels.push.enabled || self.channels.email.enabled || self.channels.slack.enabled
    }

    /// Channels switched on, in fan-out order.
    pub fn enabled_channels(&self) -> Vec<Channel> {
        Channel::DELIVERABLE
            .into_iter()
            .filter(|channel| match channel {
                Channel::Push => self.channels.push.enabled,
                Channel::Email => self.channels.email.enabled,
                Channel::Slack => self.channels.slack.enabled,
                Channel::None => false,
            })
            .collect()
    }

    /// Validate user-supplied settings before they are persisted.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.account_id.trim().is_empty() {
            return Err(CoreError::Validation("accountId is required".to_string()));
        }

        let keywords = &self.filters.priority_keywords;
        if keywords.len() > MAX_PRIORITY_KEYWORDS {
            return Err(CoreError::Validation(format!(
                "Maximum {MAX_PRIORITY_KEYWORDS} priority keywords allowed"
            )));
        }
        if keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(CoreError::Validation(
                "Priority keywords must not be empty".to_string(),
            ));
        }

        let hours = &self.filters.business_hours;
        hours.bounds()?;
        hours.tz()?;

        if self.channels.email.enabled
            && self.channels.email.address.as_deref().is_none_or(|a| !a.contains('@'))
        {
            return Err(CoreError::Validation(
                "Email channel requires a valid address".to_string(),
            ));
        }
        if self.channels.slack.enabled
            && self
                .channels
                .slack
                .webhook_url
                .as_deref()
                .is_none_or(|u| !u.starts_with("https://"))
        {
            return Err(CoreError::Validation(
                "Slack channel requires an https webhook URL".to_string(),
            ));
        }

        Ok(())
    }
}
