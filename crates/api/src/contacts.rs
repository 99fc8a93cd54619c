//! Contact assignment lookup.
//!
//! Inbound message events name a contact but not the user responsible for
//! it; the assignee comes from the CRM's contact API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::CrmConfig;

/// API version header required by the CRM.
pub const CRM_API_VERSION: &str = "2021-07-28";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ContactLookupError {
    #[error("Contact lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Contact lookup returned HTTP {0}")]
    Status(u16),

    #[error("Contact lookup is not configured")]
    NotConfigured,
}

/// Resolves which user a contact is assigned to.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// `Ok(None)` when the contact has no assignee or does not exist.
    async fn assigned_user(
        &self,
        account_id: &str,
        contact_id: &str,
    ) -> Result<Option<String>, ContactLookupError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ContactEnvelope {
    contact: Option<ContactBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactBody {
    assigned_to: Option<String>,
}

pub struct HttpContactDirectory {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpContactDirectory {
    pub fn new(config: &CrmConfig) -> Result<Self, ContactLookupError> {
        let client = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl ContactDirectory for HttpContactDirectory {
    async fn assigned_user(
        &self,
        account_id: &str,
        contact_id: &str,
    ) -> Result<Option<String>, ContactLookupError> {
        let Some(token) = self.token.as_deref() else {
            return Err(ContactLookupError::NotConfigured);
        };

        let resp = self
            .client
            .get(format!("{}/contacts/{contact_id}", self.base_url))
            .bearer_auth(token)
            .header("Version", CRM_API_VERSION)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(account_id, contact_id, "Contact not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ContactLookupError::Status(status.as_u16()));
        }

        let body: ContactEnvelope = resp.json().await?;
        Ok(body.contact.and_then(|c| c.assigned_to))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Fixed contact-to-user assignments. Unknown contacts are unassigned.
#[derive(Clone, Default)]
pub struct StaticContactDirectory {
    assignments: Arc<RwLock<HashMap<String, String>>>,
}

impl StaticContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, contact_id: impl Into<String>, user_id: impl Into<String>) {
        self.assignments
            .write()
            .await
            .insert(contact_id.into(), user_id.into());
    }
}

#[async_trait]
impl ContactDirectory for StaticContactDirectory {
    async fn assigned_user(
        &self,
        _account_id: &str,
        contact_id: &str,
    ) -> Result<Option<String>, ContactLookupError> {
        Ok(self.assignments.read().await.get(contact_id).cloned())
    }
}
