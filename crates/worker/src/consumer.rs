//! Queue consume loop.
//!
//! At most `prefetch` jobs are leased at once; a permit is taken before
//! each dequeue and released when the job is acked or nacked. The retry
//! counter lives on the job and is advanced here, not by the queue.

use std::sync::Arc;
use std::time::Duration;

use notifypro_events::{JobLease, JobQueue, QueueError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::NotificationDispatcher;

/// Pause after a dequeue error before trying again.
const DEQUEUE_BACKOFF: Duration = Duration::from_secs(1);

/// How many processing attempts a job gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    /// Counter after one more failure, and whether the job goes back on the
    /// queue.
    pub fn after_failure(&self, attempts: u32) -> (u32, bool) {
        let attempts = attempts.saturating_add(1);
        (attempts, attempts < self.max_retries)
    }
}

/// Final state of one lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying { attempts: u32 },
    DeadLettered { attempts: u32 },
}

/// Process one leased job and settle it with the queue.
pub async fn handle_job(
    dispatcher: &NotificationDispatcher,
    lease: Box<dyn JobLease>,
    policy: RetryPolicy,
) -> Result<JobOutcome, QueueError> {
    let (job_id, attempts, request) = {
        let envelope = lease.envelope();
        (envelope.id, envelope.attempts, envelope.data.clone())
    };

    let processed = dispatcher.process(&request).await;

    match processed {
        Ok(_) => {
            lease.ack().await?;
            tracing::debug!(job_id, "Job completed");
            Ok(JobOutcome::Completed)
        }
        Err(e) => {
            let (attempts, requeue) = policy.after_failure(attempts);
            tracing::warn!(job_id, attempts, requeue, error = %e, "Job processing failed");
            lease.nack(attempts, requeue, e.to_string()).await?;
            Ok(if requeue {
                JobOutcome::Retrying { attempts }
            } else {
                JobOutcome::DeadLettered { attempts }
            })
        }
    }
}

pub struct QueueConsumer {
    queue: Arc<dyn JobQueue>,
    dispatcher: Arc<NotificationDispatcher>,
    prefetch: usize,
    policy: RetryPolicy,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        dispatcher: Arc<NotificationDispatcher>,
        prefetch: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            dispatcher,
            prefetch: prefetch.max(1),
            policy,
        }
    }

    /// Consume until `cancel` fires or the queue closes, then wait for
    /// in-flight jobs to settle.
    pub async fn run(&self, cancel: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.prefetch));
        let mut tasks = JoinSet::new();

        tracing::info!(
            prefetch = self.prefetch,
            max_retries = self.policy.max_retries,
            "Queue consumer started",
        );

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let lease = tokio::select! {
                _ = cancel.cancelled() => break,
                lease = self.queue.dequeue() => match lease {
                    Ok(lease) => lease,
                    Err(QueueError::Closed) => {
                        tracing::info!("Queue closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Dequeue failed");
                        drop(permit);
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(DEQUEUE_BACKOFF) => continue,
                        }
                    }
                },
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let policy = self.policy;
            tasks.spawn(async move {
                let _permit = permit;
                if let Err(e) = handle_job(&dispatcher, lease, policy).await {
                    tracing::error!(error = %e, "Failed to settle job with the queue");
                }
            });

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Job task panicked");
                }
            }
        }

        tracing::info!(in_flight = tasks.len(), "Queue consumer draining");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Job task panicked");
            }
        }
        tracing::info!("Queue consumer stopped");
    }
}
