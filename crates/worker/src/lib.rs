//! NotifyPro dispatch worker.
//!
//! Consumes notification jobs from the queue, runs the filter decision
//! engine, fans out to the enabled channels and records every outcome.
//!
//! - [`dispatcher::NotificationDispatcher`]: processes one job.
//! - [`consumer::QueueConsumer`]: bounded-concurrency consume loop with the
//!   retry and dead-letter policy.
//! - [`background`]: log retention and stale-lease recovery loops.

pub mod background;
pub mod config;
pub mod consumer;
pub mod dispatcher;
