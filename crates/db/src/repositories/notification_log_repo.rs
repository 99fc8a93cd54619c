//! Repository for the `notification_logs` table.

use notifypro_core::log::NewNotificationLog;
use notifypro_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::notification_log::{ChannelStatusCount, NotificationLogRecord};

/// Column list for `notification_logs` queries.
const COLUMNS: &str = "id, account_id, user_id, contact_id, conversation_id, message_id, \
    channel, status, error, is_priority, was_filtered, filter_reason, message_preview, created_at";

/// Append-only access to the notification log.
pub struct NotificationLogRepo;

impl NotificationLogRepo {
    /// Append one entry, returning its ID.
    pub async fn insert(pool: &PgPool, entry: &NewNotificationLog) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notification_logs \
                (account_id, user_id, contact_id, conversation_id, message_id, channel, \
                 status, error, is_priority, was_filtered, filter_reason, message_preview) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING id",
        )
        .bind(&entry.account_id)
        .bind(entry.user_id.as_deref())
        .bind(entry.contact_id.as_deref())
        .bind(entry.conversation_id.as_deref())
        .bind(entry.message_id.as_deref())
        .bind(entry.channel.as_str())
        .bind(entry.status.as_str())
        .bind(entry.error.as_deref())
        .bind(entry.is_priority)
        .bind(entry.was_filtered)
        .bind(entry.filter_reason.map(|r| r.as_str()))
        .bind(entry.message_preview.as_deref())
        .fetch_one(pool)
        .await
    }

    /// Most recent entries for an account.
    pub async fn list_for_account(
        pool: &PgPool,
        account_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLogRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_logs \
             WHERE account_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, NotificationLogRecord>(&query)
            .bind(account_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Entry counts grouped by `(channel, status)` since `since`.
    pub async fn stats_by_account(
        pool: &PgPool,
        account_id: &str,
        since: Timestamp,
    ) -> Result<Vec<ChannelStatusCount>, sqlx::Error> {
        sqlx::query_as::<_, ChannelStatusCount>(
            "SELECT channel, status, COUNT(*) AS count \
             FROM notification_logs \
             WHERE account_id = $1 AND created_at >= $2 \
             GROUP BY channel, status \
             ORDER BY channel, status",
        )
        .bind(account_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Delete entries created before `cutoff`. Returns the number removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
