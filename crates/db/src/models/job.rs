//! Queue job rows.

use notifypro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Waiting to be claimed.
pub const JOB_STATUS_PENDING: &str = "pending";

/// Claimed by a consumer and not yet acknowledged.
pub const JOB_STATUS_IN_FLIGHT: &str = "in_flight";

/// A row from the `notification_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueuedJob {
    pub id: DbId,
    pub job_name: String,
    pub payload: serde_json::Value,
    pub priority: i16,
    pub attempts: i32,
    pub status: String,
    pub enqueued_at: Timestamp,
    pub locked_at: Option<Timestamp>,
    pub last_error: Option<String>,
}

/// Queue depth snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub in_flight: i64,
    pub dead: i64,
}

/// Result of one stale-lease sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimedJobs {
    pub requeued: u64,
    pub dead_lettered: u64,
}

impl ReclaimedJobs {
    pub fn total(&self) -> u64 {
        self.requeued + self.dead_lettered
    }
}
