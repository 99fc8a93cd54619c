//! Handlers for the `/subscriptions` resource (browser push).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use notifypro_core::subscription::{DeviceInfo, PushKeys};
use notifypro_db::models::push_subscription::NewPushSubscription;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Browser `PushSubscription.toJSON()` shape.
#[derive(Debug, Deserialize)]
pub struct BrowserSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(alias = "locationId")]
    pub account_id: String,
    pub user_id: String,
    pub subscription: BrowserSubscription,
    #[serde(default)]
    pub device: DeviceInfo,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// `?accountId=&userId=`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(alias = "locationId")]
    pub account_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub subscription_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyResponse {
    pub public_key: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/subscriptions/vapid-public-key
pub async fn vapid_public_key(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let public_key = state
        .config
        .vapid_public_key
        .clone()
        .ok_or_else(|| AppError::InternalError("Web Push is not configured".into()))?;
    Ok(Json(DataResponse {
        data: VapidKeyResponse { public_key },
    }))
}

/// POST /api/v1/subscriptions/subscribe
///
/// Registers the device as the user's only active push target.
pub async fn subscribe(
    State(state): State<AppState>,
    Json(input): Json<SubscribeRequest>,
) -> AppResult<impl IntoResponse> {
    let row = state
        .subscriptions
        .subscribe(&NewPushSubscription {
            account_id: input.account_id,
            user_id: input.user_id,
            endpoint: input.subscription.endpoint,
            keys: input.subscription.keys,
            device: input.device,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubscribeResponse {
                subscription_id: row.id,
            },
        }),
    ))
}

/// POST /api/v1/subscriptions/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(input): Json<UnsubscribeRequest>,
) -> AppResult<impl IntoResponse> {
    if input.endpoint.trim().is_empty() {
        return Err(AppError::BadRequest("endpoint is required".into()));
    }
    let deactivated = state.subscriptions.unsubscribe(&input.endpoint).await?;
    Ok(Json(DataResponse {
        data: serde_json::json!({ "deactivated": deactivated }),
    }))
}

/// GET /api/v1/subscriptions/status
pub async fn status(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> AppResult<impl IntoResponse> {
    let status = state
        .subscriptions
        .status(&params.account_id, &params.user_id)
        .await?;
    Ok(Json(DataResponse { data: status }))
}
