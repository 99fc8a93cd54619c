use std::sync::Arc;

use notifypro_events::{JobQueue, NotificationLogRecorder, PreferenceStore, PushSubscriptionManager};

use crate::config::ServerConfig;
use crate::ingest::WebhookNormalizer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every service is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Producer side of the notification job queue.
    pub queue: Arc<dyn JobQueue>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub subscriptions: PushSubscriptionManager,
    pub recorder: NotificationLogRecorder,
    pub normalizer: Arc<WebhookNormalizer>,
}
