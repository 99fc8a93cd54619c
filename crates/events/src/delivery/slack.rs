//! Slack delivery through incoming webhooks.
//!
//! Messages use Block Kit: a header, From/Time fields, the message text and
//! a button linking back to the conversation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use notifypro_core::channels::Channel;
use serde_json::{json, Value};

use super::{error_body, ChannelSender, DeliveryError, DeliveryReceipt, Destination, NotificationPayload};

/// Slack webhooks are expected to answer quickly.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Slack rejects section text longer than this.
const MAX_SECTION_CHARS: usize = 2900;

/// Posts notifications to Slack incoming webhooks.
pub struct SlackSender {
    client: reqwest::Client,
}

impl SlackSender {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChannelSender for SlackSender {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    async fn send(
        &self,
        destination: &Destination,
        payload: &NotificationPayload,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let Destination::Slack(webhook_url) = destination else {
            return Err(DeliveryError::WrongDestination(Channel::Slack));
        };

        let message = build_message(payload, &Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());
        let response = self.client.post(webhook_url).json(&message).send().await?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(DeliveryReceipt {
                channel: Channel::Slack,
                status_code: Some(status),
            });
        }

        let message = if status == 404 {
            "Invalid Slack webhook URL".to_string()
        } else {
            error_body(response, 300).await
        };
        Err(DeliveryError::Rejected { status, message })
    }
}

/// Block Kit body for one notification.
fn build_message(payload: &NotificationPayload, time: &str) -> Value {
    let header = if payload.is_priority {
        format!(":rotating_light: {}", payload.title)
    } else {
        payload.title.clone()
    };
    let text: String = payload.body.chars().take(MAX_SECTION_CHARS).collect();

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": header, "emoji": true }
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*From:*\n{}", payload.contact_name) },
                { "type": "mrkdwn", "text": format!("*Time:*\n{time}") }
            ]
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*Message:*\n{text}") }
        }),
    ];

    if !payload.url.is_empty() {
        blocks.push(json!({
            "type": "actions",
            "elements": [{
                "type": "button",
                "text": { "type": "plain_text", "text": "View Conversation" },
                "url": payload.url,
                "style": if payload.is_priority { "danger" } else { "primary" }
            }]
        }));
    }

    json!({
        "text": format!("{}: {}", payload.title, text),
        "blocks": blocks,
    })
}
