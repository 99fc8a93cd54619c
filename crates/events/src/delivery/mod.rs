//! Channel senders.
//!
//! Every delivery mechanism implements [`ChannelSender`]: one call, one
//! destination, one `Result`. Senders never retry on their own; the
//! dispatcher decides what a failure means.

use std::time::Duration;

use async_trait::async_trait;
use notifypro_core::channels::Channel;
use notifypro_core::request::NotificationRequest;
use notifypro_core::subscription::PushTarget;
use serde::Serialize;

pub mod email;
pub mod push;
pub mod slack;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Channel-agnostic notification content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub contact_name: String,
    pub url: String,
    pub conversation_id: Option<String>,
    pub contact_id: Option<String>,
    pub is_priority: bool,
    /// Play a sound on devices that support it.
    pub sound: bool,
}

impl NotificationPayload {
    pub fn from_request(request: &NotificationRequest, url: String, is_priority: bool) -> Self {
        Self {
            title: request.title(),
            body: request.message_text.clone(),
            contact_name: request.contact_name.clone(),
            url,
            conversation_id: request.conversation_id.clone(),
            contact_id: request.contact_id.clone(),
            is_priority,
            sound: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Destination / receipt
// ---------------------------------------------------------------------------

/// Where a single send goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Push(PushTarget),
    Email(String),
    Slack(String),
}

impl Destination {
    pub fn channel(&self) -> Channel {
        match self {
            Destination::Push(_) => Channel::Push,
            Destination::Email(_) => Channel::Email,
            Destination::Slack(_) => Channel::Slack,
        }
    }
}

/// Successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub channel: Channel,
    /// HTTP status returned by the backend, when there is one.
    pub status_code: Option<u16>,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for channel delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The push service no longer knows the subscription (HTTP 404/410).
    #[error("Push subscription is gone (HTTP {status})")]
    Gone { status: u16 },

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The outgoing message could not be assembled.
    #[error("Message build error: {0}")]
    Build(String),

    #[error("Push encryption failed: {0}")]
    Crypto(String),

    #[error("Invalid channel configuration: {0}")]
    Config(String),

    /// A sender was handed a destination for another channel.
    #[error("{0} sender cannot deliver to this destination")]
    WrongDestination(Channel),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// ChannelSender
// ---------------------------------------------------------------------------

/// Uniform contract implemented by every delivery channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(
        &self,
        destination: &Destination,
        payload: &NotificationPayload,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Read a response body for an error message, capped at `max_chars`.
pub(crate) async fn error_body(response: reqwest::Response, max_chars: usize) -> String {
    response
        .text()
        .await
        .map(|text| text.chars().take(max_chars).collect())
        .unwrap_or_else(|_| "<unreadable response body>".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
