use std::sync::Arc;
use std::time::Duration;

use notifypro_events::delivery::slack::DEFAULT_TIMEOUT as SLACK_TIMEOUT;
use notifypro_events::{
    ChannelSender, EmailConfig, EmailSender, NotificationLogRecorder, PgJobQueue, PgStore,
    PushSubscriptionManager, SlackSender, WebPushConfig, WebPushSender,
};
use notifypro_worker::background;
use notifypro_worker::config::WorkerConfig;
use notifypro_worker::consumer::{QueueConsumer, RetryPolicy};
use notifypro_worker::dispatcher::{ChannelSenders, NotificationDispatcher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notifypro_worker=debug,notifypro_events=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        prefetch = config.prefetch,
        max_retries = config.max_retries,
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = notifypro_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    notifypro_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    notifypro_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Channels ---
    let push: Option<Arc<dyn ChannelSender>> = WebPushConfig::from_env()
        .expect("Invalid Web Push configuration")
        .map(|cfg| Arc::new(WebPushSender::new(cfg).expect("Failed to build Web Push sender")) as _);
    let email: Option<Arc<dyn ChannelSender>> = EmailConfig::from_env()
        .map(|cfg| Arc::new(EmailSender::new(cfg).expect("Failed to build SMTP transport")) as _);
    let slack: Arc<dyn ChannelSender> =
        Arc::new(SlackSender::new(SLACK_TIMEOUT).expect("Failed to build HTTP client"));

    tracing::info!(
        push = push.is_some(),
        email = email.is_some(),
        slack = true,
        "Channel senders configured",
    );

    // --- Services ---
    let store = Arc::new(PgStore::new(pool.clone()));
    let recorder = NotificationLogRecorder::new(store.clone());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        PushSubscriptionManager::new(store.clone()),
        recorder.clone(),
        ChannelSenders {
            push,
            email,
            slack: Some(slack),
        },
        config.conversation_url_base.clone(),
        config.channel_timeout,
    ));
    let queue = PgJobQueue::new(pool, config.poll_interval).with_max_attempts(config.max_retries);
    let consumer = QueueConsumer::new(
        Arc::new(queue.clone()),
        dispatcher,
        config.prefetch,
        RetryPolicy::new(config.max_retries),
    );

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(background::run_log_retention(
        recorder,
        config.log_retention_days,
        cancel.clone(),
    ));
    let reclaim_handle = tokio::spawn(background::run_stale_reclaim(
        queue,
        config.visibility_timeout,
        cancel.clone(),
    ));

    // --- Consume ---
    let consumer_cancel = cancel.clone();
    let consumer_handle = tokio::spawn(async move { consumer.run(consumer_cancel).await });

    shutdown_signal().await;
    cancel.cancel();

    let _ = tokio::time::timeout(Duration::from_secs(30), consumer_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reclaim_handle).await;
    tracing::info!("Worker shut down");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
