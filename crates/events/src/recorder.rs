//! Append-only notification log.

use std::sync::Arc;

use chrono::{Duration, Utc};
use notifypro_core::log::NewNotificationLog;
use notifypro_core::types::DbId;
use notifypro_db::models::notification_log::{ChannelStatusCount, NotificationLogRecord};

use crate::store::{LogStore, StoreError};

/// Writes one entry per delivery attempt and answers aggregate queries.
#[derive(Clone)]
pub struct NotificationLogRecorder {
    store: Arc<dyn LogStore>,
}

impl NotificationLogRecorder {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: &NewNotificationLog) -> Result<DbId, StoreError> {
        let id = self.store.append(entry).await?;
        tracing::debug!(
            log_id = id,
            account_id = %entry.account_id,
            channel = %entry.channel,
            status = %entry.status,
            was_filtered = entry.was_filtered,
            "Notification logged",
        );
        Ok(id)
    }

    /// Counts per `(channel, status)` over the last `days` days.
    pub async fn stats(
        &self,
        account_id: &str,
        days: i64,
    ) -> Result<Vec<ChannelStatusCount>, StoreError> {
        let since = Utc::now() - Duration::days(days.max(0));
        self.store.stats(account_id, since).await
    }

    /// Newest first.
    pub async fn list(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLogRecord>, StoreError> {
        self.store.list_for_account(account_id, limit, offset).await
    }

    /// Delete entries older than `retention_days`.
    pub async fn purge(&self, retention_days: i64) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - Duration::days(retention_days.max(1));
        let removed = self.store.purge_older_than(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, retention_days, "Purged old notification logs");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use notifypro_core::channels::Channel;
    use notifypro_core::filter::FilterReason;
    use notifypro_core::request::{EventKind, NotificationRequest};

    use super::*;
    use crate::store::memory::InMemoryStore;

    fn request() -> NotificationRequest {
        NotificationRequest {
            account_id: "loc-1".to_string(),
            user_id: "u-1".to_string(),
            contact_id: Some("c-1".to_string()),
            conversation_id: None,
            message_id: None,
            message_text: "hello".to_string(),
            contact_name: "Ada".to_string(),
            event: EventKind::InboundMessage,
        }
    }

    #[tokio::test]
    async fn stats_group_by_channel_and_status() {
        let store = InMemoryStore::new();
        let recorder = NotificationLogRecorder::new(Arc::new(store.clone()));
        let req = request();

        recorder.record(&NewNotificationLog::sent(&req, Channel::Push, false)).await.unwrap();
        recorder.record(&NewNotificationLog::sent(&req, Channel::Push, true)).await.unwrap();
        recorder
            .record(&NewNotificationLog::failed(&req, Channel::Email, false, "smtp down"))
            .await
            .unwrap();
        recorder
            .record(&NewNotificationLog::filtered(&req, FilterReason::TestMode))
            .await
            .unwrap();

        let stats = recorder.stats("loc-1", 7).await.unwrap();
        let find = |channel: &str, status: &str| {
            stats
                .iter()
                .find(|s| s.channel == channel && s.status == status)
                .map(|s| s.count)
        };
        assert_eq!(find("push", "sent"), Some(2));
        assert_eq!(find("email", "failed"), Some(1));
        assert_eq!(find("none", "sent"), Some(1));
        assert!(recorder.stats("loc-2", 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let store = InMemoryStore::new();
        let recorder = NotificationLogRecorder::new(Arc::new(store.clone()));
        let req = request();

        let old = recorder.record(&NewNotificationLog::sent(&req, Channel::Slack, false)).await.unwrap();
        recorder.record(&NewNotificationLog::sent(&req, Channel::Slack, false)).await.unwrap();
        store
            .set_log_created_at(old, Utc::now() - Duration::days(120))
            .await;

        assert_eq!(recorder.purge(90).await.unwrap(), 1);
        assert_eq!(store.logs().await.len(), 1);
    }
}
