use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notifypro_api::config::ServerConfig;
use notifypro_api::contacts::HttpContactDirectory;
use notifypro_api::ingest::WebhookNormalizer;
use notifypro_api::router::build_app_router;
use notifypro_api::state::AppState;
use notifypro_events::queue::postgres::DEFAULT_POLL_INTERVAL;
use notifypro_events::{NotificationLogRecorder, PgJobQueue, PgStore, PushSubscriptionManager};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notifypro_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    if config.vapid_public_key.is_none() {
        tracing::warn!("WEB_PUSH_VAPID_PUBLIC_KEY not set, browsers cannot subscribe to push");
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = notifypro_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    notifypro_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    notifypro_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Services ---
    let store = Arc::new(PgStore::new(pool.clone()));
    let queue = Arc::new(PgJobQueue::new(pool, DEFAULT_POLL_INTERVAL));
    let contacts =
        Arc::new(HttpContactDirectory::new(&config.crm).expect("Failed to build CRM HTTP client"));
    if config.crm.token.is_none() {
        tracing::warn!("CRM_API_TOKEN not set, inbound messages cannot resolve assignees");
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        queue,
        preferences: store.clone(),
        subscriptions: PushSubscriptionManager::new(store.clone()),
        recorder: NotificationLogRecorder::new(store),
        normalizer: Arc::new(WebhookNormalizer::new(contacts)),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
