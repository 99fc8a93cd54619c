//! Persistence ports.
//!
//! The dispatcher, the subscription manager and the HTTP handlers talk to
//! storage only through these traits. [`postgres::PgStore`] is the
//! production backend; [`memory::InMemoryStore`] backs tests.

use async_trait::async_trait;
use notifypro_core::log::NewNotificationLog;
use notifypro_core::preferences::NotificationPreference;
use notifypro_core::subscription::ExpiryReason;
use notifypro_core::types::{DbId, Timestamp};
use notifypro_db::models::notification_log::{ChannelStatusCount, NotificationLogRecord};
use notifypro_db::models::push_subscription::{NewPushSubscription, PushSubscription};

pub mod memory;
pub mod postgres;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend is temporarily unusable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// The record governing `user_id`: user-specific first, then account-wide.
    /// Never creates a record.
    async fn find_effective(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<NotificationPreference>, StoreError>;

    /// The record for exactly `(account_id, user_id)`, created with defaults
    /// if absent.
    async fn get_or_create(
        &self,
        account_id: &str,
        user_id: Option<&str>,
    ) -> Result<NotificationPreference, StoreError>;

    /// Insert or replace the record for the preference's `(account, user)`.
    async fn save(
        &self,
        preference: &NotificationPreference,
    ) -> Result<NotificationPreference, StoreError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Make the endpoint the only active subscription for its user, atomically.
    async fn subscribe(&self, input: &NewPushSubscription) -> Result<PushSubscription, StoreError>;

    async fn deactivate_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError>;

    async fn mark_expired(&self, endpoint: &str, reason: ExpiryReason) -> Result<bool, StoreError>;

    async fn find_active(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<PushSubscription>, StoreError>;

    async fn list_for_user(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, StoreError>;

    async fn touch_last_used(&self, id: DbId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, entry: &NewNotificationLog) -> Result<DbId, StoreError>;

    async fn list_for_account(
        &self,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLogRecord>, StoreError>;

    async fn stats(
        &self,
        account_id: &str,
        since: Timestamp,
    ) -> Result<Vec<ChannelStatusCount>, StoreError>;

    async fn purge_older_than(&self, cutoff: Timestamp) -> Result<u64, StoreError>;
}
