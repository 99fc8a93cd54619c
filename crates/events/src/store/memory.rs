//! In-memory stores for tests and local runs.
//!
//! All three ports share one lock, so `subscribe` is trivially atomic.
//! Failure toggles make a port return [`StoreError::Unavailable`] until
//! switched back off.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use notifypro_core::log::NewNotificationLog;
use notifypro_core::preferences::NotificationPreference;
use notifypro_core::subscription::ExpiryReason;
use notifypro_core::types::{DbId, Timestamp};
use notifypro_db::models::notification_log::{ChannelStatusCount, NotificationLogRecord};
use notifypro_db::models::push_subscription::{NewPushSubscription, PushSubscription};
use tokio::sync::Mutex;

use super::{LogStore, PreferenceStore, StoreError, SubscriptionStore};

type PreferenceKey = (String, Option<String>);

#[derive(Default)]
struct StoreState {
    preferences: BTreeMap<PreferenceKey, NotificationPreference>,
    subscriptions: Vec<PushSubscription>,
    logs: Vec<NotificationLogRecord>,
    next_subscription_id: DbId,
    next_log_id: DbId,
}

#[derive(Default)]
struct FailureSwitches {
    preferences: AtomicBool,
    subscriptions: AtomicBool,
    logs: AtomicBool,
}

fn check(switch: &AtomicBool, what: &str) -> Result<(), StoreError> {
    if switch.load(Ordering::SeqCst) {
        return Err(StoreError::Unavailable(format!("{what} store offline")));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    failures: Arc<FailureSwitches>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_preferences(&self, fail: bool) {
        self.failures.preferences.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.failures.subscriptions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_logs(&self, fail: bool) {
        self.failures.logs.store(fail, Ordering::SeqCst);
    }

    /// Every log entry, oldest first.
    pub async fn logs(&self) -> Vec<NotificationLogRecord> {
        self.state.lock().await.logs.clone()
    }

    /// Every subscription row, in insertion order.
    pub async fn subscriptions(&self) -> Vec<PushSubscription> {
        self.state.lock().await.subscriptions.clone()
    }

    /// Backdate a log entry. Lets retention tests avoid waiting.
    pub async fn set_log_created_at(&self, id: DbId, created_at: Timestamp) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.logs.iter_mut().find(|l| l.id == id) {
            entry.created_at = created_at;
        }
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn find_effective(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<NotificationPreference>, StoreError> {
        check(&self.failures.preferences, "preference")?;
        let state = self.state.lock().await;
        let user_key = (account_id.to_string(), Some(user_id.to_string()));
        let account_key = (account_id.to_string(), None);
        Ok(state
            .preferences
            .get(&user_key)
            .or_else(|| state.preferences.get(&account_key))
            .cloned())
    }

    async fn get_or_create(
        &self,
        account_id: &str,
        user_id: Option<&str>,
    ) -> Result<NotificationPreference, StoreError> {
        check(&self.failures.preferences, "preference")?;
        let mut state = self.state.lock().await;
        let key = (account_id.to_string(), user_id.map(str::to_string));
        Ok(state
            .preferences
            .entry(key)
            .or_insert_with(|| {
                NotificationPreference::new(account_id, user_id.map(str::to_string))
            })
            .clone())
    }

    async fn save(
        &self,
        preference: &NotificationPreference,
    ) -> Result<NotificationPreference, StoreError> {
        check(&self.failures.preferences, "preference")?;
        let mut state = self.state.lock().await;
        let key = (preference.account_id.clone(), preference.user_id.clone());
        state.preferences.insert(key, preference.clone());
        Ok(preference.clone())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn subscribe(&self, input: &NewPushSubscription) -> Result<PushSubscription, StoreError> {
        check(&self.failures.subscriptions, "subscription")?;
        let mut state = self.state.lock().await;
        let now = Utc::now();

        for sub in state.subscriptions.iter_mut() {
            if sub.account_id == input.account_id
                && sub.user_id == input.user_id
                && sub.endpoint != input.endpoint
                && sub.is_active
            {
                sub.is_active = false;
                sub.updated_at = now;
            }
        }

        if let Some(existing) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.endpoint == input.endpoint)
        {
            existing.account_id = input.account_id.clone();
            existing.user_id = input.user_id.clone();
            existing.p256dh = input.keys.p256dh.clone();
            existing.auth = input.keys.auth.clone();
            existing.browser = input.device.browser.clone();
            existing.os = input.device.os.clone();
            existing.device_id = input.device.device_id.clone();
            existing.is_active = true;
            existing.is_expired = false;
            existing.expired_at = None;
            existing.expired_reason = None;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        state.next_subscription_id += 1;
        let row = PushSubscription {
            id: state.next_subscription_id,
            account_id: input.account_id.clone(),
            user_id: input.user_id.clone(),
            endpoint: input.endpoint.clone(),
            p256dh: input.keys.p256dh.clone(),
            auth: input.keys.auth.clone(),
            browser: input.device.browser.clone(),
            os: input.device.os.clone(),
            device_id: input.device.device_id.clone(),
            is_active: true,
            is_expired: false,
            expired_at: None,
            expired_reason: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        state.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn deactivate_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError> {
        check(&self.failures.subscriptions, "subscription")?;
        let mut state = self.state.lock().await;
        match state
            .subscriptions
            .iter_mut()
            .find(|s| s.endpoint == endpoint && s.is_active)
        {
            Some(sub) => {
                sub.is_active = false;
                sub.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_expired(&self, endpoint: &str, reason: ExpiryReason) -> Result<bool, StoreError> {
        check(&self.failures.subscriptions, "subscription")?;
        let mut state = self.state.lock().await;
        match state
            .subscriptions
            .iter_mut()
            .find(|s| s.endpoint == endpoint && !s.is_expired)
        {
            Some(sub) => {
                let now = Utc::now();
                sub.is_active = false;
                sub.is_expired = true;
                sub.expired_at = Some(now);
                sub.expired_reason = Some(reason.as_str().to_string());
                sub.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_active(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<PushSubscription>, StoreError> {
        check(&self.failures.subscriptions, "subscription")?;
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.account_id == account_id && s.user_id == user_id && s.is_active)
            .cloned())
    }

    async fn list_for_user(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, StoreError> {
        check(&self.failures.subscriptions, "subscription")?;
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .iter()
            .filter(|s| s.account_id == account_id && s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn touch_last_used(&self, id: DbId) -> Result<(), StoreError> {
        check(&self.failures.subscriptions, "subscription")?;
        let mut state = self.state.lock().await;
        if let Some(sub) = state.subscriptions.iter_mut().find(|s| s.id == id) {
            sub.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for InMemoryStore {
    async fn append(&self, entry: &NewNotificationLog) -> Result<DbId, StoreError> {
        check(&self.failures.logs, "log")?;
        let mut state = self.state.lock().await;
        state.next_log_id += 1;
        let id = state.next_log_id;
        state.logs.push(NotificationLogRecord {
            id,
            account_id: entry.account_id.clone(),
            user_id: entry.user_id.clone(),
            contact_id: entry.contact_id.clone(),
            conversation_id: entry.conversation_id.clone(),
            message_id: entry.message_id.clone(),
            channel: entry.channel.as_str().to_string(),
            status: entry.status.as_str().to_string(),
            error: entry.error.clone(),
            is_priority: entry.is_priority,
            was_filtered: entry.was_filtered,
            filter_reason: entry.filter_reason.map(|r| r.as_str().to_string()),
            message_preview: entry.message_preview.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_for_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLogRecord>, StoreError> {
        check(&self.failures.logs, "log")?;
        let state = self.state.lock().await;
        Ok(state
            .logs
            .iter()
            .rev()
            .filter(|l| l.account_id == account_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn stats(
        &self,
        account_id: &str,
        since: Timestamp,
    ) -> Result<Vec<ChannelStatusCount>, StoreError> {
        check(&self.failures.logs, "log")?;
        let state = self.state.lock().await;
        let mut counts: BTreeMap<(String, String), i64> = BTreeMap::new();
        for log in state
            .logs
            .iter()
            .filter(|l| l.account_id == account_id && l.created_at >= since)
        {
            *counts
                .entry((log.channel.clone(), log.status.clone()))
                .or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((channel, status), count)| ChannelStatusCount {
                channel,
                status,
                count,
            })
            .collect())
    }

    async fn purge_older_than(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        check(&self.failures.logs, "log")?;
        let mut state = self.state.lock().await;
        let before = state.logs.len();
        state.logs.retain(|l| l.created_at >= cutoff);
        Ok((before - state.logs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use notifypro_core::subscription::{DeviceInfo, PushKeys};

    use super::*;

    fn new_sub(user: &str, endpoint: &str) -> NewPushSubscription {
        NewPushSubscription {
            account_id: "loc-1".to_string(),
            user_id: user.to_string(),
            endpoint: endpoint.to_string(),
            keys: PushKeys {
                p256dh: "p".to_string(),
                auth: "a".to_string(),
            },
            device: DeviceInfo::default(),
        }
    }

    #[tokio::test]
    async fn effective_preference_prefers_user_record() {
        let store = InMemoryStore::new();
        let mut account_wide = NotificationPreference::new("loc-1", None);
        account_wide.features.test_mode = true;
        store.save(&account_wide).await.unwrap();

        let found = store.find_effective("loc-1", "u-1").await.unwrap().unwrap();
        assert!(found.features.test_mode);

        store
            .save(&NotificationPreference::new("loc-1", Some("u-1".to_string())))
            .await
            .unwrap();
        let found = store.find_effective("loc-1", "u-1").await.unwrap().unwrap();
        assert!(!found.features.test_mode);
        assert_eq!(found.user_id.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn find_effective_never_creates() {
        let store = InMemoryStore::new();
        assert!(store.find_effective("loc-1", "u-1").await.unwrap().is_none());
        assert!(store.find_effective("loc-1", "u-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscribe_keeps_one_active_per_user() {
        let store = InMemoryStore::new();
        store.subscribe(&new_sub("u-1", "https://push/a")).await.unwrap();
        store.subscribe(&new_sub("u-1", "https://push/b")).await.unwrap();
        store.subscribe(&new_sub("u-2", "https://push/c")).await.unwrap();

        let subs = store.subscriptions().await;
        let active: Vec<_> = subs
            .iter()
            .filter(|s| s.is_active)
            .map(|s| s.endpoint.as_str())
            .collect();
        assert_eq!(active, vec!["https://push/b", "https://push/c"]);
    }

    #[tokio::test]
    async fn resubscribe_clears_expiry() {
        let store = InMemoryStore::new();
        store.subscribe(&new_sub("u-1", "https://push/a")).await.unwrap();
        assert!(store
            .mark_expired("https://push/a", ExpiryReason::SubscriptionExpired)
            .await
            .unwrap());

        let row = store.subscribe(&new_sub("u-1", "https://push/a")).await.unwrap();
        assert!(row.is_active);
        assert!(!row.is_expired);
        assert_eq!(row.expired_reason, None);
        assert_eq!(store.subscriptions().await.len(), 1);
    }

    #[tokio::test]
    async fn failure_switch_returns_unavailable() {
        let store = InMemoryStore::new();
        store.fail_logs(true);
        let err = store.purge_older_than(Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.fail_logs(false);
        assert_eq!(store.purge_older_than(Utc::now()).await.unwrap(), 0);
    }
}
