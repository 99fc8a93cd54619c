//! In-memory job queue.
//!
//! Used by tests and by local runs without Postgres. Nothing survives a
//! restart. A lease dropped without `ack` or `nack` is taken back as one
//! failed attempt.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use notifypro_core::request::{clamp_priority, NotificationRequest, JOB_NAME};
use notifypro_core::types::DbId;
use tokio::sync::{Mutex, Notify};

use super::{JobEnvelope, JobLease, JobQueue, QueueCounts, QueueError, DEFAULT_MAX_ATTEMPTS};

/// Heap entry: higher priority first, then lower sequence (FIFO).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyEntry {
    priority: i16,
    seq: u64,
    id: DbId,
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A job that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadJob {
    pub envelope: JobEnvelope,
    pub error: String,
}

#[derive(Default)]
struct QueueState {
    jobs: HashMap<DbId, JobEnvelope>,
    ready: BinaryHeap<ReadyEntry>,
    in_flight: usize,
    dead: Vec<DeadJob>,
    next_id: DbId,
    next_seq: u64,
    closed: bool,
}

/// `error` recorded for a job whose lease was dropped unsettled.
pub const LEASE_DROPPED: &str = "lease dropped before the job was settled";

impl QueueState {
    fn push_ready(&mut self, id: DbId, priority: i16) {
        self.next_seq += 1;
        self.ready.push(ReadyEntry {
            priority,
            seq: self.next_seq,
            id,
        });
    }

    /// Take back an unsettled job, counting the lost lease as an attempt.
    fn abandon(&mut self, id: DbId, max_attempts: u32) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        job.attempts = job.attempts.saturating_add(1);
        if job.attempts < max_attempts {
            let priority = job.priority;
            self.push_ready(id, priority);
        } else if let Some(envelope) = self.jobs.remove(&id) {
            self.dead.push(DeadJob {
                envelope,
                error: LEASE_DROPPED.to_string(),
            });
        }
    }
}

/// In-memory queue implementation.
#[derive(Clone)]
pub struct InMemoryJobQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    max_attempts: u32,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            notify: Arc::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts after which a job whose lease keeps being dropped is
    /// dead-lettered.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Wake every waiting consumer with [`QueueError::Closed`].
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    /// Jobs moved to the dead-letter list, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadJob> {
        self.state.lock().await.dead.clone()
    }

    /// Snapshot of every job still waiting, in delivery order.
    pub async fn pending(&self) -> Vec<JobEnvelope> {
        let state = self.state.lock().await;
        let mut entries = state.ready.clone().into_sorted_vec();
        entries.reverse();
        entries
            .into_iter()
            .filter_map(|entry| state.jobs.get(&entry.id).cloned())
            .collect()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, request: &NotificationRequest, priority: i16) -> Result<DbId, QueueError> {
        let priority = clamp_priority(priority);
        let id = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.next_id += 1;
            let id = state.next_id;
            state.jobs.insert(
                id,
                JobEnvelope {
                    id,
                    job_name: JOB_NAME.to_string(),
                    data: request.clone(),
                    priority,
                    attempts: 0,
                    enqueued_at: Utc::now(),
                },
            );
            state.push_ready(id, priority);
            id
        };

        self.notify.notify_one();
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Box<dyn JobLease>, QueueError> {
        loop {
            // Register interest before checking state so a concurrent
            // enqueue or close between the check and the wait is not lost.
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return Err(QueueError::Closed);
                }
                while let Some(entry) = state.ready.pop() {
                    if let Some(envelope) = state.jobs.get(&entry.id).cloned() {
                        state.in_flight += 1;
                        return Ok(Box::new(InMemoryLease {
                            envelope,
                            queue: self.clone(),
                            settled: false,
                        }));
                    }
                }
            }
            notified.await;
        }
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let state = self.state.lock().await;
        Ok(QueueCounts {
            pending: state.ready.len() as i64,
            in_flight: state.in_flight as i64,
            dead: state.dead.len() as i64,
        })
    }
}

/// Lease implementation for [`InMemoryJobQueue`].
struct InMemoryLease {
    envelope: JobEnvelope,
    queue: InMemoryJobQueue,
    settled: bool,
}

impl Drop for InMemoryLease {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.envelope.id;
        let max_attempts = self.queue.max_attempts;
        tracing::warn!(job_id = id, "Lease dropped without ack or nack");

        if let Ok(mut state) = self.queue.state.try_lock() {
            state.abandon(id, max_attempts);
            drop(state);
            self.queue.notify.notify_one();
            return;
        }

        // The state lock is held elsewhere; release once it is free.
        let queue = self.queue.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                queue.state.lock().await.abandon(id, max_attempts);
                queue.notify.notify_one();
            });
        }
    }
}

#[async_trait]
impl JobLease for InMemoryLease {
    fn envelope(&self) -> &JobEnvelope {
        &self.envelope
    }

    async fn ack(mut self: Box<Self>) -> Result<(), QueueError> {
        self.settled = true;
        let mut state = self.queue.state.lock().await;
        state.jobs.remove(&self.envelope.id);
        state.in_flight = state.in_flight.saturating_sub(1);
        Ok(())
    }

    async fn nack(
        mut self: Box<Self>,
        attempts: u32,
        requeue: bool,
        error: String,
    ) -> Result<(), QueueError> {
        self.settled = true;
        {
            let mut state = self.queue.state.lock().await;
            state.in_flight = state.in_flight.saturating_sub(1);

            if requeue {
                let priority = match state.jobs.get_mut(&self.envelope.id) {
                    Some(job) => {
                        job.attempts = attempts;
                        job.priority
                    }
                    None => return Ok(()),
                };
                state.push_ready(self.envelope.id, priority);
            } else {
                let Some(mut envelope) = state.jobs.remove(&self.envelope.id) else {
                    return Ok(());
                };
                envelope.attempts = attempts;
                state.dead.push(DeadJob { envelope, error });
                return Ok(());
            }
        }

        self.queue.notify.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use notifypro_core::request::EventKind;

    use super::*;

    fn request(text: &str) -> NotificationRequest {
        NotificationRequest {
            account_id: "loc-1".to_string(),
            user_id: "u-1".to_string(),
            contact_id: None,
            conversation_id: None,
            message_id: None,
            message_text: text.to_string(),
            contact_name: "Ada".to_string(),
            event: EventKind::InboundMessage,
        }
    }

    #[tokio::test]
    async fn higher_priority_first_then_fifo() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(&request("a"), 1).await.unwrap();
        queue.enqueue(&request("b"), 1).await.unwrap();
        queue.enqueue(&request("urgent"), 10).await.unwrap();

        let order: Vec<String> = queue
            .pending()
            .await
            .into_iter()
            .map(|j| j.data.message_text)
            .collect();
        assert_eq!(order, vec!["urgent", "a", "b"]);

        let first = queue.dequeue().await.unwrap();
        assert_eq!(first.envelope().data.message_text, "urgent");
        let second = queue.dequeue().await.unwrap();
        assert_eq!(second.envelope().data.message_text, "a");
    }

    #[tokio::test]
    async fn ack_removes_job() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(&request("a"), 1).await.unwrap();

        let lease = queue.dequeue().await.unwrap();
        assert_eq!(queue.counts().await.unwrap().in_flight, 1);
        lease.ack().await.unwrap();

        assert_eq!(queue.counts().await.unwrap(), QueueCounts::default());
    }

    #[tokio::test]
    async fn nack_with_requeue_redelivers_with_attempts() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(&request("a"), 1).await.unwrap();

        let lease = queue.dequeue().await.unwrap();
        lease.nack(1, true, "boom".to_string()).await.unwrap();

        let again = queue.dequeue().await.unwrap();
        assert_eq!(again.envelope().attempts, 1);
    }

    #[tokio::test]
    async fn nack_without_requeue_dead_letters() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(&request("a"), 1).await.unwrap();

        let lease = queue.dequeue().await.unwrap();
        lease.nack(3, false, "boom".to_string()).await.unwrap();

        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].envelope.attempts, 3);
        assert_eq!(dead[0].error, "boom");
        let counts = queue.counts().await.unwrap();
        assert_eq!((counts.pending, counts.in_flight, counts.dead), (0, 0, 1));
    }

    #[tokio::test]
    async fn dequeue_waits_for_enqueue() {
        let queue = InMemoryJobQueue::new();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await.map(|l| l.envelope().id) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let id = queue.enqueue(&request("late"), 1).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(got, id);
    }

    #[tokio::test]
    async fn close_wakes_waiting_consumers() {
        let queue = InMemoryJobQueue::new();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await.err() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close().await;

        let err = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(err, Some(QueueError::Closed)));
    }

    #[tokio::test]
    async fn dropped_lease_is_redelivered_with_an_extra_attempt() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(&request("a"), 1).await.unwrap();

        let lease = queue.dequeue().await.unwrap();
        drop(lease);

        let counts = queue.counts().await.unwrap();
        assert_eq!((counts.pending, counts.in_flight), (1, 0));
        let again = tokio::time::timeout(Duration::from_secs(1), queue.dequeue())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.envelope().attempts, 1);
        again.ack().await.unwrap();
        assert_eq!(queue.counts().await.unwrap(), QueueCounts::default());
    }

    #[tokio::test]
    async fn repeatedly_dropped_lease_ends_in_dead_letters() {
        let queue = InMemoryJobQueue::new().with_max_attempts(2);
        queue.enqueue(&request("a"), 1).await.unwrap();

        drop(queue.dequeue().await.unwrap());
        drop(queue.dequeue().await.unwrap());

        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].envelope.attempts, 2);
        assert_eq!(dead[0].error, LEASE_DROPPED);
        let counts = queue.counts().await.unwrap();
        assert_eq!((counts.pending, counts.in_flight, counts.dead), (0, 0, 1));
    }

    #[tokio::test]
    async fn priority_is_clamped_on_enqueue() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(&request("a"), 99).await.unwrap();
        assert_eq!(queue.pending().await[0].priority, 10);
    }
}
