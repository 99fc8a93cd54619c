//! Handlers for notification preferences.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use notifypro_core::preferences::NotificationPreference;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// `?accountId=[&userId=]`. Without `userId` the account-wide record is used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsQuery {
    #[serde(alias = "locationId")]
    pub account_id: String,
    pub user_id: Option<String>,
}

/// GET /api/v1/settings
///
/// Returns the record, creating it with defaults on first read.
pub async fn get_settings(
    State(state): State<AppState>,
    Query(params): Query<SettingsQuery>,
) -> AppResult<impl IntoResponse> {
    if params.account_id.trim().is_empty() {
        return Err(AppError::BadRequest("accountId is required".into()));
    }
    let user_id = params.user_id.as_deref().filter(|u| !u.trim().is_empty());
    let preference = state
        .preferences
        .get_or_create(&params.account_id, user_id)
        .await?;
    Ok(Json(DataResponse { data: preference }))
}

/// PUT /api/v1/settings
///
/// Replaces the record for the body's `(accountId, userId)` after validation.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(mut input): Json<NotificationPreference>,
) -> AppResult<impl IntoResponse> {
    input.user_id = input.user_id.filter(|u| !u.trim().is_empty());
    input.validate()?;

    let saved = state.preferences.save(&input).await?;
    tracing::info!(
        account_id = %saved.account_id,
        user_id = ?saved.user_id,
        channels = ?saved.enabled_channels(),
        "Notification settings updated",
    );
    Ok(Json(DataResponse { data: saved }))
}
