#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use notifypro_api::config::{CrmConfig, ServerConfig};
use notifypro_api::contacts::StaticContactDirectory;
use notifypro_api::ingest::WebhookNormalizer;
use notifypro_api::router::build_app_router;
use notifypro_api::state::AppState;
use notifypro_events::{
    InMemoryJobQueue, InMemoryStore, NotificationLogRecorder, PushSubscriptionManager,
};

pub const ACCOUNT: &str = "loc-1";
pub const USER: &str = "user-1";
pub const CONTACT: &str = "contact-1";

/// Uncompressed P-256 generator point, base64url.
pub const P256DH: &str =
    "BGsX0fLhLEJH-Lzm5WOkQPJ3A32BLeszoPShOUXYmMKWT-NC4v4af5uO5-tKfA-eFivOM1drMV7Oy7ZAaDe_UfU";
pub const AUTH: &str = "AAECAwQFBgcICQoLDA0ODw";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        vapid_public_key: Some("test-vapid-public-key".to_string()),
        crm: CrmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            token: None,
        },
    }
}

/// The router plus handles on its in-memory backends.
pub struct TestApp {
    pub router: Router,
    pub store: InMemoryStore,
    pub queue: InMemoryJobQueue,
    pub contacts: Arc<StaticContactDirectory>,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

/// Same middleware stack as the binary, backed by in-memory stores.
pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = InMemoryStore::new();
    let queue = InMemoryJobQueue::new();
    let contacts = Arc::new(StaticContactDirectory::new());
    let shared = Arc::new(store.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
        queue: Arc::new(queue.clone()),
        preferences: shared.clone(),
        subscriptions: PushSubscriptionManager::new(shared.clone()),
        recorder: NotificationLogRecorder::new(shared),
        normalizer: Arc::new(WebhookNormalizer::new(contacts.clone())),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        queue,
        contacts,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: &serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &serde_json::Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: &serde_json::Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, body).await
}

pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn inbound_message(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "InboundMessage",
        "locationId": ACCOUNT,
        "contactId": CONTACT,
        "conversationId": "conv-1",
        "messageId": "msg-1",
        "body": text,
        "contactName": "Ada Lovelace",
    })
}

pub fn subscribe_body(endpoint: &str) -> serde_json::Value {
    serde_json::json!({
        "accountId": ACCOUNT,
        "userId": USER,
        "subscription": {
            "endpoint": endpoint,
            "keys": { "p256dh": P256DH, "auth": AUTH },
        },
        "device": { "browser": "Firefox", "os": "Linux" },
    })
}
