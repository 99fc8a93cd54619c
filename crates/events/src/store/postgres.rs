//! Postgres-backed stores, delegating to the `notifypro-db` repositories.

use async_trait::async_trait;
use notifypro_core::log::NewNotificationLog;
use notifypro_core::preferences::NotificationPreference;
use notifypro_core::subscription::ExpiryReason;
use notifypro_core::types::{DbId, Timestamp};
use notifypro_db::models::notification_log::{ChannelStatusCount, NotificationLogRecord};
use notifypro_db::models::push_subscription::{NewPushSubscription, PushSubscription};
use notifypro_db::repositories::{NotificationLogRepo, PreferenceRepo, PushSubscriptionRepo};
use notifypro_db::DbPool;

use super::{LogStore, PreferenceStore, StoreError, SubscriptionStore};

/// Implements every store port over one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn find_effective(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<NotificationPreference>, StoreError> {
        Ok(PreferenceRepo::find_effective(&self.pool, account_id, user_id)
            .await?
            .map(Into::into))
    }

    async fn get_or_create(
        &self,
        account_id: &str,
        user_id: Option<&str>,
    ) -> Result<NotificationPreference, StoreError> {
        let defaults = NotificationPreference::new(account_id, user_id.map(str::to_string));
        Ok(PreferenceRepo::get_or_create(&self.pool, &defaults).await?.into())
    }

    async fn save(
        &self,
        preference: &NotificationPreference,
    ) -> Result<NotificationPreference, StoreError> {
        Ok(PreferenceRepo::upsert(&self.pool, preference).await?.into())
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn subscribe(&self, input: &NewPushSubscription) -> Result<PushSubscription, StoreError> {
        Ok(PushSubscriptionRepo::subscribe(&self.pool, input).await?)
    }

    async fn deactivate_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError> {
        Ok(PushSubscriptionRepo::deactivate_by_endpoint(&self.pool, endpoint).await?)
    }

    async fn mark_expired(&self, endpoint: &str, reason: ExpiryReason) -> Result<bool, StoreError> {
        Ok(PushSubscriptionRepo::mark_expired(&self.pool, endpoint, reason.as_str()).await?)
    }

    async fn find_active(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<PushSubscription>, StoreError> {
        Ok(PushSubscriptionRepo::find_active(&self.pool, account_id, user_id).await?)
    }

    async fn list_for_user(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, StoreError> {
        Ok(PushSubscriptionRepo::list_for_user(&self.pool, account_id, user_id).await?)
    }

    async fn touch_last_used(&self, id: DbId) -> Result<(), StoreError> {
        Ok(PushSubscriptionRepo::touch_last_used(&self.pool, id).await?)
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn append(&self, entry: &NewNotificationLog) -> Result<DbId, StoreError> {
        Ok(NotificationLogRepo::insert(&self.pool, entry).await?)
    }

    async fn list_for_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLogRecord>, StoreError> {
        Ok(NotificationLogRepo::list_for_account(&self.pool, account_id, limit, offset).await?)
    }

    async fn stats(
        &self,
        account_id: &str,
        since: Timestamp,
    ) -> Result<Vec<ChannelStatusCount>, StoreError> {
        Ok(NotificationLogRepo::stats_by_account(&self.pool, account_id, since).await?)
    }

    async fn purge_older_than(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        Ok(NotificationLogRepo::delete_older_than(&self.pool, cutoff).await?)
    }
}
