//! Repository for the `push_subscriptions` table.

use notifypro_core::types::DbId;
use sqlx::PgPool;

use crate::models::push_subscription::{NewPushSubscription, PushSubscription};

/// Column list for `push_subscriptions` queries.
const COLUMNS: &str = "id, account_id, user_id, endpoint, p256dh, auth, browser, os, device_id, \
    is_active, is_expired, expired_at, expired_reason, last_used_at, created_at, updated_at";

/// Partial unique index allowing one active row per `(account_id, user_id)`.
pub const ACTIVE_USER_CONSTRAINT: &str = "uq_push_subscriptions_active_user";

/// Times a subscribe transaction is retried after losing a race on
/// [`ACTIVE_USER_CONSTRAINT`].
const SUBSCRIBE_ATTEMPTS: usize = 5;

/// Provides subscription lifecycle operations.
pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// Make `input.endpoint` the only active subscription for its user.
    ///
    /// Runs in one transaction: every other active row for the
    /// `(account_id, user_id)` pair is deactivated, then the endpoint is
    /// upserted as active with its expiry cleared. Two concurrent calls for
    /// the same user collide on [`ACTIVE_USER_CONSTRAINT`]; the loser retries
    /// and, seeing the winner's row, deactivates it. The last writer wins.
    pub async fn subscribe(
        pool: &PgPool,
        input: &NewPushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let mut attempt = 1;
        loop {
            match Self::subscribe_once(pool, input).await {
                Err(sqlx::Error::Database(db_err))
                    if db_err.constraint() == Some(ACTIVE_USER_CONSTRAINT)
                        && attempt < SUBSCRIBE_ATTEMPTS =>
                {
                    tracing::debug!(
                        account_id = %input.account_id,
                        user_id = %input.user_id,
                        attempt,
                        "Concurrent subscribe detected, retrying",
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn subscribe_once(
        pool: &PgPool,
        input: &NewPushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE push_subscriptions \
             SET is_active = false, updated_at = NOW() \
             WHERE account_id = $1 AND user_id = $2 AND is_active AND endpoint <> $3",
        )
        .bind(&input.account_id)
        .bind(&input.user_id)
        .bind(&input.endpoint)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO push_subscriptions \
                (account_id, user_id, endpoint, p256dh, auth, browser, os, device_id, \
                 is_active, is_expired) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, false) \
             ON CONFLICT (endpoint) DO UPDATE SET \
                account_id = EXCLUDED.account_id, \
                user_id = EXCLUDED.user_id, \
                p256dh = EXCLUDED.p256dh, \
                auth = EXCLUDED.auth, \
                browser = EXCLUDED.browser, \
                os = EXCLUDED.os, \
                device_id = EXCLUDED.device_id, \
                is_active = true, \
                is_expired = false, \
                expired_at = NULL, \
                expired_reason = NULL, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PushSubscription>(&query)
            .bind(&input.account_id)
            .bind(&input.user_id)
            .bind(&input.endpoint)
            .bind(&input.keys.p256dh)
            .bind(&input.keys.auth)
            .bind(input.device.browser.as_deref())
            .bind(input.device.os.as_deref())
            .bind(input.device.device_id.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Deactivate a subscription by endpoint (client opt-out).
    ///
    /// Returns `true` if an active row was deactivated.
    pub async fn deactivate_by_endpoint(pool: &PgPool, endpoint: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE push_subscriptions \
             SET is_active = false, updated_at = NOW() \
             WHERE endpoint = $1 AND is_active",
        )
        .bind(endpoint)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a subscription expired and inactive.
    ///
    /// Returns `true` if a row was found for the endpoint.
    pub async fn mark_expired(
        pool: &PgPool,
        endpoint: &str,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE push_subscriptions \
             SET is_active = false, is_expired = true, expired_at = NOW(), \
                 expired_reason = $2, updated_at = NOW() \
             WHERE endpoint = $1",
        )
        .bind(endpoint)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The single active subscription for a user, if any.
    pub async fn find_active(
        pool: &PgPool,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE account_id = $1 AND user_id = $2 AND is_active"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(account_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Every subscription a user has ever registered, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        account_id: &str,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE account_id = $1 AND user_id = $2 \
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(account_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Record a successful delivery.
    pub async fn touch_last_used(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE push_subscriptions SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
