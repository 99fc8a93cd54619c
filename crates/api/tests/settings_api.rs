//! Integration tests for notification preferences.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, put_json, ACCOUNT, USER};
use serde_json::json;

#[tokio::test]
async fn first_read_creates_defaults() {
    let app = common::build_test_app();

    let response = get(app.router.clone(), &format!("/api/v1/settings?accountId={ACCOUNT}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["accountId"], ACCOUNT);
    assert!(data["userId"].is_null());
    assert_eq!(data["channels"]["push"]["enabled"], true);
    assert_eq!(data["channels"]["email"]["enabled"], false);
    assert_eq!(data["filters"]["businessHours"]["start"], "09:00");
    assert_eq!(data["features"]["testMode"], false);
}

#[tokio::test]
async fn update_then_read_back_user_record() {
    let app = common::build_test_app();

    let body = json!({
        "accountId": ACCOUNT,
        "userId": USER,
        "channels": {
            "push": { "enabled": false },
            "slack": { "enabled": true, "webhookUrl": "https://hooks.slack.com/services/T/B/X" },
        },
        "filters": { "priorityKeywords": ["urgent", "asap"] },
    });
    let response = put_json(app.router.clone(), "/api/v1/settings", &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(
        app.router.clone(),
        &format!("/api/v1/settings?accountId={ACCOUNT}&userId={USER}"),
    )
    .await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["userId"], USER);
    assert_eq!(data["channels"]["push"]["enabled"], false);
    assert_eq!(data["channels"]["slack"]["enabled"], true);
    assert_eq!(data["filters"]["priorityKeywords"], json!(["urgent", "asap"]));
}

// ---------------------------------------------------------------------------
// Test: invalid settings are rejected with 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_timezone_is_rejected() {
    let app = common::build_test_app();

    let body = json!({
        "accountId": ACCOUNT,
        "filters": { "businessHours": { "timezone": "Mars/Olympus_Mons" } },
    });
    let response = put_json(app.router.clone(), "/api/v1/settings", &body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn email_without_address_is_rejected() {
    let app = common::build_test_app();

    let body = json!({
        "accountId": ACCOUNT,
        "channels": { "email": { "enabled": true } },
    });
    let response = put_json(app.router.clone(), "/api/v1/settings", &body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_account_is_rejected() {
    let app = common::build_test_app();

    let response = get(app.router.clone(), "/api/v1/settings?accountId=%20").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_outage_maps_to_503() {
    let app = common::build_test_app();
    app.store.fail_preferences(true);

    let response = get(app.router.clone(), &format!("/api/v1/settings?accountId={ACCOUNT}")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "UNAVAILABLE");
}
