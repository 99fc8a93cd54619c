//! Notification preference rows.

use notifypro_core::preferences::{
    ChannelSettings, FeatureFlags, FilterSettings, NotificationPreference,
};
use notifypro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

/// A row from the `notification_preferences` table.
///
/// The JSONB blocks decode through the core types, so partial documents
/// come back fully defaulted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PreferenceRecord {
    pub id: DbId,
    pub account_id: String,
    pub user_id: Option<String>,
    pub channels: Json<ChannelSettings>,
    pub filters: Json<FilterSettings>,
    pub features: Json<FeatureFlags>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PreferenceRecord> for NotificationPreference {
    fn from(row: PreferenceRecord) -> Self {
        NotificationPreference {
            account_id: row.account_id,
            user_id: row.user_id,
            channels: row.channels.0,
            filters: row.filters.0,
            features: row.features.0,
        }
    }
}
