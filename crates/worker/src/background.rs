//! Periodic maintenance loops.
//!
//! Each function runs until its [`CancellationToken`] fires and is meant to
//! be spawned with `tokio::spawn`.

use std::time::Duration;

use notifypro_events::{NotificationLogRecorder, PgJobQueue};
use tokio_util::sync::CancellationToken;

/// How often old log entries are purged.
pub const RETENTION_INTERVAL: Duration = Duration::from_secs(3600);

/// How often stale in-flight jobs are returned to the queue.
pub const RECLAIM_INTERVAL: Duration = Duration::from_secs(60);

/// Delete log entries older than `retention_days`, hourly.
pub async fn run_log_retention(
    recorder: NotificationLogRecorder,
    retention_days: i64,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_days,
        interval_secs = RETENTION_INTERVAL.as_secs(),
        "Log retention job started",
    );

    let mut interval = tokio::time::interval(RETENTION_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Log retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match recorder.purge(retention_days).await {
                    Ok(0) => tracing::debug!("Log retention: nothing to purge"),
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Log retention: cleanup failed"),
                }
            }
        }
    }
}

/// Recover jobs leased longer than `visibility_timeout`.
pub async fn run_stale_reclaim(
    queue: PgJobQueue,
    visibility_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(RECLAIM_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match queue.reclaim_stale(visibility_timeout).await {
                    Ok(reclaimed) if reclaimed.total() == 0 => {}
                    Ok(reclaimed) => tracing::warn!(
                        requeued = reclaimed.requeued,
                        dead_lettered = reclaimed.dead_lettered,
                        "Recovered jobs with expired leases",
                    ),
                    Err(e) => tracing::error!(error = %e, "Stale job reclaim failed"),
                }
            }
        }
    }
}
