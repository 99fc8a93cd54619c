//! Read-only views over the notification log.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use notifypro_db::models::notification_log::ChannelStatusCount;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_STATS_DAYS: i64 = 7;
const MAX_STATS_DAYS: i64 = 365;
const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(alias = "locationId")]
    pub account_id: String,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    #[serde(alias = "locationId")]
    pub account_id: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub account_id: String,
    pub days: i64,
    pub total: i64,
    pub counts: Vec<ChannelStatusCount>,
}

fn require_account(account_id: &str) -> AppResult<()> {
    if account_id.trim().is_empty() {
        return Err(AppError::BadRequest("accountId is required".into()));
    }
    Ok(())
}

/// GET /api/v1/notifications/stats
///
/// Log entry counts per `(channel, status)` over the last `days` (default 7).
pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> AppResult<impl IntoResponse> {
    require_account(&params.account_id)?;
    let days = params
        .days
        .unwrap_or(DEFAULT_STATS_DAYS)
        .clamp(1, MAX_STATS_DAYS);

    let counts = state.recorder.stats(&params.account_id, days).await?;
    let total = counts.iter().map(|c| c.count).sum();

    Ok(Json(DataResponse {
        data: StatsResponse {
            account_id: params.account_id,
            days,
            total,
            counts,
        },
    }))
}

/// GET /api/v1/notifications
///
/// Most recent log entries for an account.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<LogQuery>,
) -> AppResult<impl IntoResponse> {
    require_account(&params.account_id)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let entries = state
        .recorder
        .list(&params.account_id, limit, offset)
        .await?;
    Ok(Json(DataResponse { data: entries }))
}
