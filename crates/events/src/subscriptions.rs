//! Push subscription lifecycle.
//!
//! At most one subscription per `(account, user)` is active. Subscribing a
//! new device supersedes the previous one; a push backend answering 410 or
//! 404 moves the subscription to `expired` until the browser subscribes
//! again.

use std::sync::Arc;

use notifypro_core::error::CoreError;
use notifypro_core::subscription::{ExpiryReason, SubscriptionStatus};
use notifypro_core::types::DbId;
use notifypro_db::models::push_subscription::{NewPushSubscription, PushSubscription};
use url::Url;

use crate::delivery::push::validate_keys;
use crate::store::{StoreError, SubscriptionStore};

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct PushSubscriptionManager {
    store: Arc<dyn SubscriptionStore>,
}

impl PushSubscriptionManager {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Register a device and make it the user's only active subscription.
    pub async fn subscribe(
        &self,
        input: &NewPushSubscription,
    ) -> Result<PushSubscription, SubscriptionError> {
        validate_new(input)?;
        let row = self.store.subscribe(input).await?;
        tracing::info!(
            account_id = %row.account_id,
            user_id = %row.user_id,
            subscription_id = row.id,
            "Push subscription activated",
        );
        Ok(row)
    }

    /// Deactivate by endpoint. Returns whether an active row was found.
    pub async fn unsubscribe(&self, endpoint: &str) -> Result<bool, SubscriptionError> {
        let found = self.store.deactivate_by_endpoint(endpoint).await?;
        if found {
            tracing::info!(endpoint, "Push subscription deactivated");
        }
        Ok(found)
    }

    /// React to a failed push. 410 and 404 expire the subscription; any
    /// other status leaves it untouched.
    pub async fn report_delivery_failure(
        &self,
        endpoint: &str,
        status: u16,
    ) -> Result<Option<ExpiryReason>, SubscriptionError> {
        let Some(reason) = ExpiryReason::from_status(status) else {
            return Ok(None);
        };
        if self.store.mark_expired(endpoint, reason).await? {
            tracing::warn!(endpoint, status, reason = %reason, "Push subscription expired");
        }
        Ok(Some(reason))
    }

    pub async fn get_active(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<PushSubscription>, SubscriptionError> {
        Ok(self.store.find_active(account_id, user_id).await?)
    }

    pub async fn status(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<SubscriptionStatus, SubscriptionError> {
        let rows = self.store.list_for_user(account_id, user_id).await?;
        Ok(SubscriptionStatus::from_states(rows.iter().map(PushSubscription::state)))
    }

    /// Stamp `last_used_at` after a successful push.
    pub async fn record_success(&self, id: DbId) -> Result<(), SubscriptionError> {
        Ok(self.store.touch_last_used(id).await?)
    }
}

fn validate_new(input: &NewPushSubscription) -> Result<(), CoreError> {
    if input.account_id.trim().is_empty() {
        return Err(CoreError::Validation("accountId is required".to_string()));
    }
    if input.user_id.trim().is_empty() {
        return Err(CoreError::Validation("userId is required".to_string()));
    }

    let endpoint = Url::parse(&input.endpoint)
        .map_err(|e| CoreError::Validation(format!("Invalid endpoint URL: {e}")))?;
    if endpoint.scheme() != "https" {
        return Err(CoreError::Validation(
            "Push endpoint must use https".to_string(),
        ));
    }

    validate_keys(&input.keys).map_err(|e| CoreError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use notifypro_core::subscription::{DeviceInfo, PushKeys, SubscriptionState};
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use p256::SecretKey;
    use rand_core::OsRng;

    use super::*;
    use crate::store::memory::InMemoryStore;

    fn browser_keys() -> PushKeys {
        let secret = SecretKey::random(&mut OsRng);
        let point = secret.public_key().to_encoded_point(false);
        PushKeys {
            p256dh: URL_SAFE_NO_PAD.encode(point.as_bytes()),
            auth: URL_SAFE_NO_PAD.encode([7u8; 16]),
        }
    }

    fn input(user: &str, endpoint: &str) -> NewPushSubscription {
        NewPushSubscription {
            account_id: "loc-1".to_string(),
            user_id: user.to_string(),
            endpoint: endpoint.to_string(),
            keys: browser_keys(),
            device: DeviceInfo {
                browser: Some("Firefox".to_string()),
                ..DeviceInfo::default()
            },
        }
    }

    fn manager() -> (PushSubscriptionManager, InMemoryStore) {
        let store = InMemoryStore::new();
        (PushSubscriptionManager::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn second_device_supersedes_first() {
        let (manager, _) = manager();
        manager.subscribe(&input("u-1", "https://push.example.com/a")).await.unwrap();
        manager.subscribe(&input("u-1", "https://push.example.com/b")).await.unwrap();

        let active = manager.get_active("loc-1", "u-1").await.unwrap().unwrap();
        assert_eq!(active.endpoint, "https://push.example.com/b");
        let status = manager.status("loc-1", "u-1").await.unwrap();
        assert!(status.has_active_subscription);
        assert!(!status.has_expired_subscription);
    }

    #[tokio::test]
    async fn gone_expires_and_resubscribe_reactivates() {
        let (manager, store) = manager();
        let endpoint = "https://push.example.com/a";
        manager.subscribe(&input("u-1", endpoint)).await.unwrap();

        let reason = manager.report_delivery_failure(endpoint, 410).await.unwrap();
        assert_eq!(reason, Some(ExpiryReason::SubscriptionExpired));
        assert!(manager.get_active("loc-1", "u-1").await.unwrap().is_none());
        let status = manager.status("loc-1", "u-1").await.unwrap();
        assert!(!status.has_active_subscription);
        assert!(status.has_expired_subscription);

        manager.subscribe(&input("u-1", endpoint)).await.unwrap();
        let rows = store.subscriptions().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state(), SubscriptionState::Active);
    }

    #[tokio::test]
    async fn other_failures_leave_subscription_alone() {
        let (manager, _) = manager();
        let endpoint = "https://push.example.com/a";
        manager.subscribe(&input("u-1", endpoint)).await.unwrap();

        assert_eq!(manager.report_delivery_failure(endpoint, 500).await.unwrap(), None);
        assert!(manager.get_active("loc-1", "u-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unsubscribe_deactivates_without_expiring() {
        let (manager, store) = manager();
        let endpoint = "https://push.example.com/a";
        manager.subscribe(&input("u-1", endpoint)).await.unwrap();

        assert!(manager.unsubscribe(endpoint).await.unwrap());
        assert!(!manager.unsubscribe(endpoint).await.unwrap());
        assert_eq!(store.subscriptions().await[0].state(), SubscriptionState::Inactive);
    }

    #[tokio::test]
    async fn rejects_plain_http_and_bad_keys() {
        let (manager, _) = manager();
        let err = manager
            .subscribe(&input("u-1", "http://push.example.com/a"))
            .await
            .unwrap_err();
        assert_matches!(err, SubscriptionError::Invalid(CoreError::Validation(_)));

        let mut bad = input("u-1", "https://push.example.com/a");
        bad.keys.p256dh = "short".to_string();
        let err = manager.subscribe(&bad).await.unwrap_err();
        assert_matches!(err, SubscriptionError::Invalid(CoreError::Validation(_)));

        let err = manager
            .subscribe(&input(" ", "https://push.example.com/a"))
            .await
            .unwrap_err();
        assert_matches!(err, SubscriptionError::Invalid(_));
    }

    #[tokio::test]
    async fn success_stamps_last_used() {
        let (manager, store) = manager();
        let row = manager
            .subscribe(&input("u-1", "https://push.example.com/a"))
            .await
            .unwrap();
        assert!(row.last_used_at.is_none());

        manager.record_success(row.id).await.unwrap();
        assert!(store.subscriptions().await[0].last_used_at.is_some());
    }
}
