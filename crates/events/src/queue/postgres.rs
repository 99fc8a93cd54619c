//! Durable job queue on PostgreSQL.
//!
//! Jobs live in `notification_jobs` until acknowledged. Consumers claim rows
//! with `FOR UPDATE SKIP LOCKED`, so any number of worker processes can share
//! the table. A row left `in_flight` by a crashed consumer is recovered by
//! [`PgJobQueue::reclaim_stale`], which counts the lost lease as an attempt.
//!
//! Each lease remembers the `locked_at` it claimed the row with; ack and
//! nack only touch the row while that lease is still current.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notifypro_core::request::{clamp_priority, NotificationRequest, JOB_NAME};
use notifypro_core::types::{DbId, Timestamp};
use notifypro_db::models::job::{QueuedJob, ReclaimedJobs};
use notifypro_db::repositories::JobRepo;
use notifypro_db::DbPool;
use tokio::sync::Notify;

use super::{JobEnvelope, JobLease, JobQueue, QueueCounts, QueueError, DEFAULT_MAX_ATTEMPTS};

/// Default delay between claim attempts on an empty queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `last_error` recorded on jobs recovered from an expired lease.
pub const LEASE_EXPIRED: &str = "lease expired before the job was settled";

/// Postgres-backed queue.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: DbPool,
    poll_interval: Duration,
    max_attempts: u32,
    /// Wakes local consumers on local enqueues; remote enqueues are picked
    /// up by polling.
    notify: Arc<Notify>,
}

impl PgJobQueue {
    pub fn new(pool: DbPool, poll_interval: Duration) -> Self {
        Self {
            pool,
            poll_interval,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Attempts after which a job whose lease keeps expiring is
    /// dead-lettered. Should match the consumer's retry policy.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Recover in-flight jobs older than `visibility_timeout`.
    pub async fn reclaim_stale(
        &self,
        visibility_timeout: Duration,
    ) -> Result<ReclaimedJobs, QueueError> {
        let secs = i64::try_from(visibility_timeout.as_secs()).unwrap_or(i64::MAX);
        let max_attempts = i32::try_from(self.max_attempts).unwrap_or(i32::MAX);
        Ok(JobRepo::reclaim_stale(&self.pool, secs, max_attempts, LEASE_EXPIRED).await?)
    }

    /// Decode a claimed row. Rows whose payload no longer parses are
    /// dead-lettered immediately; retrying them cannot succeed.
    async fn decode(
        &self,
        job: QueuedJob,
        locked_at: Timestamp,
    ) -> Result<Option<JobEnvelope>, QueueError> {
        match serde_json::from_value::<NotificationRequest>(job.payload.clone()) {
            Ok(data) => Ok(Some(JobEnvelope {
                id: job.id,
                job_name: job.job_name,
                data,
                priority: job.priority,
                attempts: u32::try_from(job.attempts).unwrap_or(0),
                enqueued_at: job.enqueued_at,
            })),
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Malformed job payload, dead-lettering");
                JobRepo::dead_letter(
                    &self.pool,
                    job.id,
                    locked_at,
                    job.attempts,
                    Some(&format!("Malformed payload: {e}")),
                )
                .await?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, request: &NotificationRequest, priority: i16) -> Result<DbId, QueueError> {
        let payload = serde_json::to_value(request)?;
        let id = JobRepo::enqueue(&self.pool, JOB_NAME, &payload, clamp_priority(priority)).await?;
        self.notify.notify_one();
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Box<dyn JobLease>, QueueError> {
        loop {
            if let Some(job) = JobRepo::claim_next(&self.pool).await? {
                // claim_next always stamps the lease.
                let Some(locked_at) = job.locked_at else {
                    continue;
                };
                if let Some(envelope) = self.decode(job, locked_at).await? {
                    return Ok(Box::new(PgLease {
                        envelope,
                        locked_at,
                        pool: self.pool.clone(),
                    }));
                }
                continue;
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        Ok(JobRepo::counts(&self.pool).await?)
    }
}

/// Lease over one claimed `notification_jobs` row.
struct PgLease {
    envelope: JobEnvelope,
    locked_at: Timestamp,
    pool: DbPool,
}

impl PgLease {
    fn lost(&self, action: &str) {
        tracing::warn!(
            job_id = self.envelope.id,
            action,
            "Lease expired before settlement; the job belongs to another consumer",
        );
    }
}

#[async_trait]
impl JobLease for PgLease {
    fn envelope(&self) -> &JobEnvelope {
        &self.envelope
    }

    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        if !JobRepo::complete(&self.pool, self.envelope.id, self.locked_at).await? {
            self.lost("ack");
        }
        Ok(())
    }

    async fn nack(
        self: Box<Self>,
        attempts: u32,
        requeue: bool,
        error: String,
    ) -> Result<(), QueueError> {
        let attempts = i32::try_from(attempts).unwrap_or(i32::MAX);
        if requeue {
            let requeued = JobRepo::requeue(
                &self.pool,
                self.envelope.id,
                self.locked_at,
                attempts,
                Some(&error),
            )
            .await?;
            if !requeued {
                self.lost("requeue");
            }
        } else {
            match JobRepo::dead_letter(
                &self.pool,
                self.envelope.id,
                self.locked_at,
                attempts,
                Some(&error),
            )
            .await?
            {
                Some(dead_letter_id) => tracing::warn!(
                    job_id = self.envelope.id,
                    dead_letter_id,
                    attempts,
                    "Job moved to dead-letter queue",
                ),
                None => self.lost("dead_letter"),
            }
        }
        Ok(())
    }
}
