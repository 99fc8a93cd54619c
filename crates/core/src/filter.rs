//! Filter decision engine.
//!
//! [`decide`] is a pure function over a preference record, the message text,
//! and the evaluation instant. It performs no I/O and holds no state, so the
//! same inputs always produce the same [`FilterDecision`].
//!
//! Evaluation order:
//!
//! 1. no preference record        -> skip (`no_preference`)
//! 2. no channel enabled          -> skip (`no_channels`)
//! 3. test mode                   -> skip (`test_mode`)
//! 4. priority keyword match      -> notify, priority (`priority_keyword`)
//! 5. outside business hours      -> skip (`business_hours`)
//! 6. otherwise                   -> notify (`business_hours_ok`)
//!
//! Priority keywords are checked before business hours, so they always win.
//! A business-hours window that cannot be evaluated (bad timezone or time
//! format) counts as "inside business hours".

use std::fmt;

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::{BusinessDay, BusinessHours, NotificationPreference};

/// Why the engine reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    NoPreference,
    NoChannels,
    TestMode,
    PriorityKeyword,
    BusinessHours,
    BusinessHoursOk,
}

impl FilterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterReason::NoPreference => "no_preference",
            FilterReason::NoChannels => "no_channels",
            FilterReason::TestMode => "test_mode",
            FilterReason::PriorityKeyword => "priority_keyword",
            FilterReason::BusinessHours => "business_hours",
            FilterReason::BusinessHoursOk => "business_hours_ok",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDecision {
    pub notify: bool,
    pub is_priority: bool,
    pub reason: FilterReason,
}

impl FilterDecision {
    fn skip(reason: FilterReason) -> Self {
        Self {
            notify: false,
            is_priority: false,
            reason,
        }
    }

    fn deliver(is_priority: bool, reason: FilterReason) -> Self {
        Self {
            notify: true,
            is_priority,
            reason,
        }
    }
}

/// Decide whether `message` should be delivered under `preferences` at `now`.
pub fn decide(
    preferences: Option<&NotificationPreference>,
    message: &str,
    now: DateTime<Utc>,
) -> FilterDecision {
    let Some(preferences) = preferences else {
        return FilterDecision::skip(FilterReason::NoPreference);
    };

    if !preferences.has_enabled_channels() {
        return FilterDecision::skip(FilterReason::NoChannels);
    }

    if preferences.features.test_mode {
        return FilterDecision::skip(FilterReason::TestMode);
    }

    if matches_priority_keyword(message, &preferences.filters.priority_keywords) {
        return FilterDecision::deliver(true, FilterReason::PriorityKeyword);
    }

    if preferences.filters.business_hours_only
        && !within_business_hours(&preferences.filters.business_hours, now)
    {
        return FilterDecision::skip(FilterReason::BusinessHours);
    }

    FilterDecision::deliver(false, FilterReason::BusinessHoursOk)
}

/// Case-insensitive substring match of any keyword against `text`.
///
/// Blank keywords never match.
pub fn matches_priority_keyword(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() || text.is_empty() {
        return false;
    }

    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .any(|k| haystack.contains(&k.to_lowercase()))
}

/// Whether `now` falls inside the business-hours window.
///
/// The current day must be one of the configured days and the current time
/// of day (minute precision) must lie in `[start, end]`. When `end < start`
/// the window is `[start, 23:59] ∪ [00:00, end]`.
///
/// Returns `true` when the timezone or the bounds cannot be parsed.
pub fn within_business_hours(hours: &BusinessHours, now: DateTime<Utc>) -> bool {
    let tz = match hours.tz() {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!(error = %e, "Business hours check failed, allowing notification");
            return true;
        }
    };
    let (start, end) = match hours.bounds() {
        Ok(bounds) => bounds,
        Err(e) => {
            tracing::warn!(error = %e, "Business hours check failed, allowing notification");
            return true;
        }
    };

    let local = now.with_timezone(&tz);
    if !hours.days.contains(&BusinessDay::from(local.weekday())) {
        return false;
    }

    let Some(current) = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0) else {
        return true;
    };

    if start <= end {
        current >= start && current <= end
    } else {
        current >= start || current <= end
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    /// 2024-01-03 is a Wednesday.
    fn wednesday_utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, hour, minute, 0).unwrap()
    }

    fn business_hours_pref(start: &str, end: &str, tz: &str) -> NotificationPreference {
        let mut pref = NotificationPreference::new("loc-1", None);
        pref.filters.business_hours_only = true;
        pref.filters.business_hours.start = start.to_string();
        pref.filters.business_hours.end = end.to_string();
        pref.filters.business_hours.timezone = tz.to_string();
        pref
    }

    #[test]
    fn missing_preferences_skip() {
        let d = decide(None, "hello", wednesday_utc(12, 0));
        assert!(!d.notify);
        assert_eq!(d.reason, FilterReason::NoPreference);
    }

    #[test]
    fn no_enabled_channels_skip() {
        let mut pref = NotificationPreference::new("loc-1", None);
        pref.channels.push.enabled = false;
        let d = decide(Some(&pref), "hello", wednesday_utc(12, 0));
        assert!(!d.notify);
        assert_eq!(d.reason, FilterReason::NoChannels);
    }

    #[test]
    fn test_mode_skips_even_with_keyword() {
        let mut pref = NotificationPreference::new("loc-1", None);
        pref.features.test_mode = true;
        pref.filters.priority_keywords = vec!["urgent".to_string()];
        let d = decide(Some(&pref), "URGENT", wednesday_utc(12, 0));
        assert!(!d.notify);
        assert_eq!(d.reason, FilterReason::TestMode);
    }

    #[test]
    fn priority_keyword_bypasses_business_hours() {
        let mut pref = business_hours_pref("09:00", "17:00", "UTC");
        pref.filters.priority_keywords = vec!["urgent".to_string()];

        let d = decide(Some(&pref), "This is URGENT please call", wednesday_utc(3, 0));
        assert_eq!(
            d,
            FilterDecision {
                notify: true,
                is_priority: true,
                reason: FilterReason::PriorityKeyword,
            }
        );
    }

    #[test]
    fn outside_business_hours_skips() {
        let pref = business_hours_pref("09:00", "17:00", "UTC");
        let d = decide(Some(&pref), "hello", wednesday_utc(3, 0));
        assert!(!d.notify);
        assert_eq!(d.reason, FilterReason::BusinessHours);
    }

    #[test]
    fn inside_business_hours_notifies() {
        let pref = business_hours_pref("09:00", "17:00", "UTC");
        let d = decide(Some(&pref), "hello", wednesday_utc(17, 0));
        assert!(d.notify);
        assert!(!d.is_priority);
        assert_eq!(d.reason, FilterReason::BusinessHoursOk);
    }

    #[test]
    fn business_hours_disabled_always_notifies() {
        let pref = NotificationPreference::new("loc-1", None);
        let d = decide(Some(&pref), "hello", wednesday_utc(3, 0));
        assert!(d.notify);
        assert_eq!(d.reason, FilterReason::BusinessHoursOk);
    }

    #[test]
    fn midnight_wraparound_window() {
        let pref = business_hours_pref("22:00", "02:00", "UTC");
        let hours = &pref.filters.business_hours;

        assert!(within_business_hours(hours, wednesday_utc(23, 30)));
        assert!(within_business_hours(hours, wednesday_utc(1, 15)));
        assert!(!within_business_hours(hours, wednesday_utc(10, 0)));
    }

    #[test]
    fn non_business_day_is_outside() {
        let pref = business_hours_pref("09:00", "17:00", "UTC");
        // 2024-01-06 is a Saturday.
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap();
        assert!(!within_business_hours(&pref.filters.business_hours, saturday));
    }

    #[test]
    fn timezone_shifts_the_window() {
        // 14:00 UTC is 09:00 in New York (EST, UTC-5) on this date.
        let pref = business_hours_pref("09:00", "17:00", "America/New_York");
        assert!(within_business_hours(&pref.filters.business_hours, wednesday_utc(14, 0)));
        assert!(!within_business_hours(&pref.filters.business_hours, wednesday_utc(13, 59)));
    }

    #[test]
    fn invalid_timezone_fails_open() {
        let pref = business_hours_pref("09:00", "17:00", "Not/AZone");
        let d = decide(Some(&pref), "hello", wednesday_utc(3, 0));
        assert!(d.notify);
        assert_eq!(d.reason, FilterReason::BusinessHoursOk);
    }

    #[test]
    fn invalid_time_format_fails_open() {
        let pref = business_hours_pref("nine", "17:00", "UTC");
        assert!(within_business_hours(&pref.filters.business_hours, wednesday_utc(3, 0)));
    }

    #[test]
    fn keyword_matching_is_case_insensitive_substring() {
        let keywords = vec!["Refund".to_string(), "  ".to_string()];
        assert!(matches_priority_keyword("need a REFUNDED order", &keywords));
        assert!(!matches_priority_keyword("hello there", &keywords));
        assert!(!matches_priority_keyword("anything", &[]));
    }

    #[test]
    fn blank_keyword_never_matches() {
        assert!(!matches_priority_keyword("anything", &["".to_string()]));
    }

    #[test]
    fn decision_is_deterministic() {
        let mut pref = business_hours_pref("22:00", "02:00", "UTC");
        pref.filters.priority_keywords = vec!["asap".to_string()];
        let now = wednesday_utc(12, 0);

        let first = decide(Some(&pref), "call me", now);
        let second = decide(Some(&pref), "call me", now);
        assert_eq!(first, second);
    }
}
