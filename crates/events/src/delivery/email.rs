//! Email notification delivery via SMTP.
//!
//! [`EmailSender`] wraps the `lettre` async SMTP transport and sends a
//! multipart (plain text + HTML) message. Configuration is loaded from
//! environment variables; if `SMTP_HOST` is not set, [`EmailConfig::from_env`]
//! returns `None` and no sender should be constructed.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use notifypro_core::channels::Channel;

use super::{ChannelSender, DeliveryError, DeliveryReceipt, Destination, NotificationPayload};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@notifypro.local";

/// Default display name when `SMTP_FROM_NAME` is not set.
const DEFAULT_FROM_NAME: &str = "NotifyPro";

/// Configuration for the SMTP email sender.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Display name shown next to the "From" address.
    pub from_name: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable         | Required | Default                   |
    /// |------------------|----------|---------------------------|
    /// | `SMTP_HOST`      | yes      | -                         |
    /// | `SMTP_PORT`      | no       | `587`                     |
    /// | `SMTP_FROM`      | no       | `noreply@notifypro.local` |
    /// | `SMTP_FROM_NAME` | no       | `NotifyPro`               |
    /// | `SMTP_USER`      | no       | -                         |
    /// | `SMTP_PASSWORD`  | no       | -                         |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| DEFAULT_FROM_NAME.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailSender
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP.
pub struct EmailSender {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailSender {
    /// Build the transport once; connections are pooled by `lettre`.
    pub fn new(config: EmailConfig) -> Result<Self, DeliveryError> {
        let from = Mailbox::new(Some(config.from_name.clone()), config.from_address.parse()?);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from,
            mailer: builder.build(),
        })
    }

    fn build_message(&self, to: &str, payload: &NotificationPayload) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject(payload))
            .multipart(MultiPart::alternative_plain_html(
                render_text(payload),
                render_html(payload),
            ))
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(
        &self,
        destination: &Destination,
        payload: &NotificationPayload,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let Destination::Email(to) = destination else {
            return Err(DeliveryError::WrongDestination(Channel::Email));
        };

        let message = self.build_message(to, payload)?;
        let response = self.mailer.send(message).await?;

        tracing::info!(to = %to, code = %response.code(), "Notification email sent");
        Ok(DeliveryReceipt {
            channel: Channel::Email,
            status_code: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn subject(payload: &NotificationPayload) -> String {
    if payload.is_priority {
        format!("[Priority] {}", payload.title)
    } else {
        payload.title.clone()
    }
}

fn render_text(payload: &NotificationPayload) -> String {
    format!(
        "{}\n\nFrom: {}\nMessage: {}\n\nView conversation: {}\n",
        payload.title, payload.contact_name, payload.body, payload.url
    )
}

fn render_html(payload: &NotificationPayload) -> String {
    let badge = if payload.is_priority {
        r#"<p style="color:#b91c1c;font-weight:bold;margin:0 0 12px">Priority message</p>"#
    } else {
        ""
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family:Arial,sans-serif;background:#f4f4f5;padding:24px">
  <div style="max-width:560px;margin:0 auto;background:#ffffff;border-radius:8px;padding:24px">
    <h2 style="margin:0 0 16px">{title}</h2>
    {badge}
    <p style="margin:0 0 8px"><strong>From:</strong> {contact}</p>
    <p style="margin:0 0 8px"><strong>Message:</strong></p>
    <div style="background:#f9fafb;border-left:4px solid #2563eb;padding:12px;white-space:pre-wrap">{body}</div>
    <p style="margin:24px 0 0">
      <a href="{url}" style="background:#2563eb;color:#ffffff;padding:10px 18px;border-radius:6px;text-decoration:none">View Conversation</a>
    </p>
  </div>
</body>
</html>"#,
        title = escape_html(&payload.title),
        contact = escape_html(&payload.contact_name),
        body = escape_html(&payload.body),
        url = escape_html(&payload.url),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
