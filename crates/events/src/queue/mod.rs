//! Job queue port.
//!
//! The queue is the only shared mutable resource between webhook ingestion
//! and dispatch. Producers call [`JobQueue::enqueue`]; consumers take a
//! [`JobLease`] from [`JobQueue::dequeue`] and must either `ack` or `nack`
//! it. Delivery is at-least-once: a job leaves the queue only on `ack`, and
//! a `nack` either requeues it or moves it to the dead-letter store.
//!
//! The attempt counter is owned by the consumer and passed back on `nack`.
//! A lease that is never settled (consumer crash, dropped lease) still
//! counts as one attempt when the queue takes the job back.

use async_trait::async_trait;
use notifypro_core::request::NotificationRequest;
use notifypro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod postgres;

pub use notifypro_db::models::job::{QueueCounts, ReclaimedJobs};

/// Total processing attempts before a job is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),

    /// The queue was shut down while waiting for a job.
    #[error("Queue is closed")]
    Closed,
}

/// A job as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEnvelope {
    pub id: DbId,
    pub job_name: String,
    pub data: NotificationRequest,
    /// Broker-level priority, 0-10. Advisory ordering hint only.
    pub priority: i16,
    /// Failed processing attempts so far.
    pub attempts: u32,
    pub enqueued_at: Timestamp,
}

/// A leased job. The holder owns it until `ack` or `nack`.
#[async_trait]
pub trait JobLease: Send {
    fn envelope(&self) -> &JobEnvelope;

    /// Processing finished; remove the job.
    async fn ack(self: Box<Self>) -> Result<(), QueueError>;

    /// Processing failed.
    ///
    /// `attempts` is the consumer's updated counter. With `requeue` the job
    /// returns to the queue; without it the job is dead-lettered.
    async fn nack(
        self: Box<Self>,
        attempts: u32,
        requeue: bool,
        error: String,
    ) -> Result<(), QueueError>;
}

/// Durable, priority-capable, at-least-once queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Accept a job. `priority` is clamped to 0-10.
    async fn enqueue(&self, request: &NotificationRequest, priority: i16) -> Result<DbId, QueueError>;

    /// Wait for the next job.
    async fn dequeue(&self) -> Result<Box<dyn JobLease>, QueueError>;

    async fn counts(&self) -> Result<QueueCounts, QueueError>;
}
