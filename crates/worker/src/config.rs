use std::time::Duration;

use notifypro_core::log::DEFAULT_RETENTION_DAYS;
use notifypro_core::request::DEFAULT_CONVERSATION_URL_BASE;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs processed concurrently (unacknowledged).
    pub prefetch: usize,
    /// Processing attempts before a job is dead-lettered.
    pub max_retries: u32,
    /// Delay between claim attempts on an empty queue.
    pub poll_interval: Duration,
    /// Per-channel send timeout.
    pub channel_timeout: Duration,
    pub log_retention_days: i64,
    /// In-flight jobs older than this are returned to the queue.
    pub visibility_timeout: Duration,
    pub conversation_url_base: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            prefetch: 5,
            max_retries: 3,
            poll_interval: Duration::from_millis(500),
            channel_timeout: Duration::from_secs(5),
            log_retention_days: DEFAULT_RETENTION_DAYS,
            visibility_timeout: Duration::from_secs(300),
            conversation_url_base: DEFAULT_CONVERSATION_URL_BASE.to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                        |
    /// |---------------------------|--------------------------------|
    /// | `PREFETCH`                | `5`                            |
    /// | `MAX_RETRIES`             | `3`                            |
    /// | `POLL_INTERVAL_MS`        | `500`                          |
    /// | `CHANNEL_TIMEOUT_SECS`    | `5`                            |
    /// | `LOG_RETENTION_DAYS`      | `90`                           |
    /// | `VISIBILITY_TIMEOUT_SECS` | `300`                          |
    /// | `CONVERSATION_URL_BASE`   | `https://app.gohighlevel.com`  |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let prefetch: usize = std::env::var("PREFETCH")
            .unwrap_or_else(|_| defaults.prefetch.to_string())
            .parse()
            .expect("PREFETCH must be a valid usize");

        let max_retries: u32 = std::env::var("MAX_RETRIES")
            .unwrap_or_else(|_| defaults.max_retries.to_string())
            .parse()
            .expect("MAX_RETRIES must be a valid u32");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let channel_timeout_secs: u64 = std::env::var("CHANNEL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("CHANNEL_TIMEOUT_SECS must be a valid u64");

        let log_retention_days: i64 = std::env::var("LOG_RETENTION_DAYS")
            .unwrap_or_else(|_| defaults.log_retention_days.to_string())
            .parse()
            .expect("LOG_RETENTION_DAYS must be a valid i64");

        let visibility_timeout_secs: u64 = std::env::var("VISIBILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("VISIBILITY_TIMEOUT_SECS must be a valid u64");

        let conversation_url_base = std::env::var("CONVERSATION_URL_BASE")
            .unwrap_or(defaults.conversation_url_base);

        Self {
            prefetch: prefetch.max(1),
            max_retries: max_retries.max(1),
            poll_interval: Duration::from_millis(poll_interval_ms),
            channel_timeout: Duration::from_secs(channel_timeout_secs),
            log_retention_days,
            visibility_timeout: Duration::from_secs(visibility_timeout_secs),
            conversation_url_base,
        }
    }
}
