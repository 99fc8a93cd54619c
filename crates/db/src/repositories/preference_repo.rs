//! Repository for the `notification_preferences` table.

use notifypro_core::preferences::NotificationPreference;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::preference::PreferenceRecord;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str =
    "id, account_id, user_id, channels, filters, features, created_at, updated_at";

/// Provides lookup and upsert for notification preferences.
pub struct PreferenceRepo;

impl PreferenceRepo {
    /// Find the record for exactly `(account_id, user_id)`.
    ///
    /// `user_id = None` selects the account-wide record.
    pub async fn find(
        pool: &PgPool,
        account_id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<PreferenceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences \
             WHERE account_id = $1 AND user_id IS NOT DISTINCT FROM $2"
        );
        sqlx::query_as::<_, PreferenceRecord>(&query)
            .bind(account_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the record that governs `user_id` within an account.
    ///
    /// A user-specific record wins over the account-wide one.
    pub async fn find_effective(
        pool: &PgPool,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<PreferenceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences \
             WHERE account_id = $1 AND (user_id = $2 OR user_id IS NULL) \
             ORDER BY user_id NULLS LAST \
             LIMIT 1"
        );
        sqlx::query_as::<_, PreferenceRecord>(&query)
            .bind(account_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Return the existing record, inserting `defaults` first if none exists.
    pub async fn get_or_create(
        pool: &PgPool,
        defaults: &NotificationPreference,
    ) -> Result<PreferenceRecord, sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_preferences \
                (account_id, user_id, channels, filters, features) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (account_id, (COALESCE(user_id, ''))) DO NOTHING",
        )
        .bind(&defaults.account_id)
        .bind(defaults.user_id.as_deref())
        .bind(Json(&defaults.channels))
        .bind(Json(&defaults.filters))
        .bind(Json(&defaults.features))
        .execute(pool)
        .await?;

        Self::find(pool, &defaults.account_id, defaults.user_id.as_deref())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Insert or replace the record for the preference's `(account, user)`.
    pub async fn upsert(
        pool: &PgPool,
        preference: &NotificationPreference,
    ) -> Result<PreferenceRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences \
                (account_id, user_id, channels, filters, features) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (account_id, (COALESCE(user_id, ''))) DO UPDATE SET \
                channels = EXCLUDED.channels, \
                filters = EXCLUDED.filters, \
                features = EXCLUDED.features, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreferenceRecord>(&query)
            .bind(&preference.account_id)
            .bind(preference.user_id.as_deref())
            .bind(Json(&preference.channels))
            .bind(Json(&preference.filters))
            .bind(Json(&preference.features))
            .fetch_one(pool)
            .await
    }
}
