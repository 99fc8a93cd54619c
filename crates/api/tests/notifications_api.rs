//! Integration tests for the notification log views.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, ACCOUNT, USER};
use notifypro_core::channels::Channel;
use notifypro_core::filter::FilterReason;
use notifypro_core::log::NewNotificationLog;
use notifypro_core::request::{EventKind, NotificationRequest};
use notifypro_events::LogStore;

fn request() -> NotificationRequest {
    NotificationRequest {
        account_id: ACCOUNT.to_string(),
        user_id: USER.to_string(),
        contact_id: Some("contact-1".to_string()),
        conversation_id: None,
        message_id: None,
        message_text: "hello".to_string(),
        contact_name: "Ada".to_string(),
        event: EventKind::InboundMessage,
    }
}

async fn seed(app: &common::TestApp) {
    let req = request();
    let entries = [
        NewNotificationLog::sent(&req, Channel::Push, false),
        NewNotificationLog::sent(&req, Channel::Push, true),
        NewNotificationLog::failed(&req, Channel::Slack, false, "HTTP 500"),
        NewNotificationLog::filtered(&req, FilterReason::BusinessHours),
    ];
    for entry in &entries {
        app.store.append(entry).await.unwrap();
    }
}

#[tokio::test]
async fn stats_count_by_channel_and_status() {
    let app = common::build_test_app();
    seed(&app).await;

    let response = get(
        app.router.clone(),
        &format!("/api/v1/notifications/stats?accountId={ACCOUNT}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["days"], 7);
    assert_eq!(data["total"], 4);

    let counts = data["counts"].as_array().unwrap();
    let push_sent = counts
        .iter()
        .find(|c| c["channel"] == "push" && c["status"] == "sent")
        .unwrap();
    assert_eq!(push_sent["count"], 2);
}

#[tokio::test]
async fn stats_for_other_account_are_empty() {
    let app = common::build_test_app();
    seed(&app).await;

    let response = get(
        app.router.clone(),
        "/api/v1/notifications/stats?accountId=loc-2&days=30",
    )
    .await;

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["days"], 30);
    assert_eq!(data["total"], 0);
}

#[tokio::test]
async fn list_pages_entries() {
    let app = common::build_test_app();
    seed(&app).await;

    let response = get(
        app.router.clone(),
        &format!("/api/v1/notifications?accountId={ACCOUNT}&limit=3"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn stats_require_account() {
    let app = common::build_test_app();

    let response = get(app.router.clone(), "/api/v1/notifications/stats?accountId=").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
