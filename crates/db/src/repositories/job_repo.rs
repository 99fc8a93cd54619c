//! Repository for the `notification_jobs` and `notification_dead_letters`
//! tables.

use notifypro_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{
    QueueCounts, QueuedJob, ReclaimedJobs, JOB_STATUS_IN_FLIGHT, JOB_STATUS_PENDING,
};

/// Column list for `notification_jobs` queries.
const COLUMNS: &str =
    "id, job_name, payload, priority, attempts, status, enqueued_at, locked_at, last_error";

/// Durable queue storage.
pub struct JobRepo;

impl JobRepo {
    /// Insert a pending job, returning its ID.
    pub async fn enqueue(
        pool: &PgPool,
        job_name: &str,
        payload: &serde_json::Value,
        priority: i16,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notification_jobs (job_name, payload, priority, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(job_name)
        .bind(payload)
        .bind(priority)
        .bind(JOB_STATUS_PENDING)
        .fetch_one(pool)
        .await
    }

    /// Atomically claim the next pending job.
    ///
    /// Highest priority first, FIFO within a priority. `SKIP LOCKED` lets
    /// concurrent consumers claim different rows without blocking.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<QueuedJob>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_jobs \
             SET status = $1, locked_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM notification_jobs \
                 WHERE status = $2 \
                 ORDER BY priority DESC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueuedJob>(&query)
            .bind(JOB_STATUS_IN_FLIGHT)
            .bind(JOB_STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Remove an acknowledged job.
    ///
    /// Only the holder of the lease taken at `locked_at` may settle the row;
    /// returns `false` when the lease was lost to a reclaim.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        locked_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notification_jobs \
             WHERE id = $1 AND status = $2 AND locked_at = $3",
        )
        .bind(job_id)
        .bind(JOB_STATUS_IN_FLIGHT)
        .bind(locked_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return a leased job to the pending set with a new attempt count.
    pub async fn requeue(
        pool: &PgPool,
        job_id: DbId,
        locked_at: Timestamp,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_jobs \
             SET status = $4, locked_at = NULL, attempts = $5, last_error = $6 \
             WHERE id = $1 AND status = $2 AND locked_at = $3",
        )
        .bind(job_id)
        .bind(JOB_STATUS_IN_FLIGHT)
        .bind(locked_at)
        .bind(JOB_STATUS_PENDING)
        .bind(attempts)
        .bind(last_error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a leased job into the dead-letter table in one transaction.
    ///
    /// Returns the dead-letter ID, or `None` if the row is gone or now held
    /// under a different lease.
    pub async fn dead_letter(
        pool: &PgPool,
        job_id: DbId,
        locked_at: Timestamp,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "DELETE FROM notification_jobs \
             WHERE id = $1 AND status = $2 AND locked_at = $3 \
             RETURNING {COLUMNS}"
        );
        let Some(job) = sqlx::query_as::<_, QueuedJob>(&query)
            .bind(job_id)
            .bind(JOB_STATUS_IN_FLIGHT)
            .bind(locked_at)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO notification_dead_letters \
                (job_id, job_name, payload, priority, attempts, last_error, enqueued_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(job.id)
        .bind(&job.job_name)
        .bind(&job.payload)
        .bind(job.priority)
        .bind(attempts)
        .bind(last_error.or(job.last_error.as_deref()))
        .bind(job.enqueued_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(id))
    }

    /// Recover jobs whose lease is older than `older_than_secs`.
    ///
    /// An expired lease counts as a failed attempt. Jobs that reach
    /// `max_attempts` this way are dead-lettered; the rest go back to
    /// pending.
    pub async fn reclaim_stale(
        pool: &PgPool,
        older_than_secs: i64,
        max_attempts: i32,
        error: &str,
    ) -> Result<ReclaimedJobs, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let dead_lettered = sqlx::query(
            "WITH expired AS ( \
                 DELETE FROM notification_jobs \
                 WHERE status = $1 \
                   AND locked_at < NOW() - make_interval(secs => $2) \
                   AND attempts + 1 >= $3 \
                 RETURNING id, job_name, payload, priority, attempts, enqueued_at \
             ) \
             INSERT INTO notification_dead_letters \
                (job_id, job_name, payload, priority, attempts, last_error, enqueued_at) \
             SELECT id, job_name, payload, priority, attempts + 1, $4, enqueued_at \
             FROM expired",
        )
        .bind(JOB_STATUS_IN_FLIGHT)
        .bind(older_than_secs as f64)
        .bind(max_attempts)
        .bind(error)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let requeued = sqlx::query(
            "UPDATE notification_jobs \
             SET status = $1, locked_at = NULL, attempts = attempts + 1, last_error = $4 \
             WHERE status = $2 AND locked_at < NOW() - make_interval(secs => $3)",
        )
        .bind(JOB_STATUS_PENDING)
        .bind(JOB_STATUS_IN_FLIGHT)
        .bind(older_than_secs as f64)
        .bind(error)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(ReclaimedJobs {
            requeued,
            dead_lettered,
        })
    }

    pub async fn counts(pool: &PgPool) -> Result<QueueCounts, sqlx::Error> {
        sqlx::query_as::<_, QueueCounts>(
            "SELECT \
                (SELECT COUNT(*) FROM notification_jobs WHERE status = $1) AS pending, \
                (SELECT COUNT(*) FROM notification_jobs WHERE status = $2) AS in_flight, \
                (SELECT COUNT(*) FROM notification_dead_letters) AS dead",
        )
        .bind(JOB_STATUS_PENDING)
        .bind(JOB_STATUS_IN_FLIGHT)
        .fetch_one(pool)
        .await
    }
}
