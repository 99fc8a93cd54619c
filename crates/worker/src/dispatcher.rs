//! Per-job processing: filter, fan out, record.
//!
//! Channel failures are contained: each enabled channel is attempted
//! concurrently under its own timeout and produces its own log entry.
//! Only failures that mean the job could not be processed at all (the
//! preference lookup, the filtered-log write) escape as [`DispatchError`]
//! so the consumer's retry policy can act.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use notifypro_core::channels::Channel;
use notifypro_core::filter::{self, FilterDecision};
use notifypro_core::log::NewNotificationLog;
use notifypro_core::preferences::NotificationPreference;
use notifypro_core::request::{conversation_url, NotificationRequest};
use notifypro_core::types::{DbId, Timestamp};
use notifypro_events::{
    ChannelSender, DeliveryError, Destination, NotificationLogRecorder, NotificationPayload,
    PreferenceStore, PushSubscriptionManager, StoreError,
};

/// Log error for a channel with no sender configured.
pub const NOT_CONFIGURED: &str = "channel not configured";

/// Log error for push when the user has no active device.
pub const NO_ACTIVE_SUBSCRIPTION: &str = "no active push subscription";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Preference lookup failed: {0}")]
    Preferences(#[source] StoreError),

    #[error("Filtered log write failed: {0}")]
    Log(#[source] StoreError),
}

/// Configured senders. `None` means the channel is not set up in this
/// deployment.
#[derive(Clone, Default)]
pub struct ChannelSenders {
    pub push: Option<Arc<dyn ChannelSender>>,
    pub email: Option<Arc<dyn ChannelSender>>,
    pub slack: Option<Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelSender>> {
        match channel {
            Channel::Push => self.push.as_ref(),
            Channel::Email => self.email.as_ref(),
            Channel::Slack => self.slack.as_ref(),
            Channel::None => None,
        }
    }
}

/// What happened on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: Channel,
    /// `None` on success.
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn is_sent(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of processing one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub decision: FilterDecision,
    /// Empty when the job was filtered.
    pub channels: Vec<ChannelOutcome>,
}

pub struct NotificationDispatcher {
    preferences: Arc<dyn PreferenceStore>,
    subscriptions: PushSubscriptionManager,
    recorder: NotificationLogRecorder,
    senders: ChannelSenders,
    url_base: String,
    channel_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        subscriptions: PushSubscriptionManager,
        recorder: NotificationLogRecorder,
        senders: ChannelSenders,
        url_base: impl Into<String>,
        channel_timeout: Duration,
    ) -> Self {
        Self {
            preferences,
            subscriptions,
            recorder,
            senders,
            url_base: url_base.into(),
            channel_timeout,
        }
    }

    pub async fn process(
        &self,
        request: &NotificationRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.process_at(request, Utc::now()).await
    }

    /// Process `request` as if the current time were `now`.
    pub async fn process_at(
        &self,
        request: &NotificationRequest,
        now: Timestamp,
    ) -> Result<DispatchOutcome, DispatchError> {
        let preference = self
            .preferences
            .find_effective(&request.account_id, &request.user_id)
            .await
            .map_err(DispatchError::Preferences)?;

        let decision = filter::decide(preference.as_ref(), &request.message_text, now);

        let preference = match preference {
            Some(p) if decision.notify => p,
            _ => {
                tracing::info!(
                    account_id = %request.account_id,
                    user_id = %request.user_id,
                    reason = %decision.reason,
                    "Notification filtered",
                );
                self.recorder
                    .record(&NewNotificationLog::filtered(request, decision.reason))
                    .await
                    .map_err(DispatchError::Log)?;
                return Ok(DispatchOutcome {
                    decision,
                    channels: Vec::new(),
                });
            }
        };

        let url = conversation_url(
            &self.url_base,
            &request.account_id,
            request.conversation_id.as_deref(),
        );
        let mut payload = NotificationPayload::from_request(request, url, decision.is_priority);
        payload.sound = preference.channels.push.sound;

        // Email and Slack without a target are switched off in effect: no
        // attempt and no log entry.
        let attempts = preference
            .enabled_channels()
            .into_iter()
            .filter(|channel| is_addressable(*channel, &preference))
            .map(|channel| self.deliver(channel, &preference, request, &payload));
        let channels = join_all(attempts).await;

        tracing::info!(
            account_id = %request.account_id,
            user_id = %request.user_id,
            is_priority = decision.is_priority,
            sent = channels.iter().filter(|c| c.is_sent()).count(),
            failed = channels.iter().filter(|c| !c.is_sent()).count(),
            "Notification dispatched",
        );

        Ok(DispatchOutcome { decision, channels })
    }

    /// Attempt one channel and log the result.
    async fn deliver(
        &self,
        channel: Channel,
        preference: &NotificationPreference,
        request: &NotificationRequest,
        payload: &NotificationPayload,
    ) -> ChannelOutcome {
        let result = self.attempt(channel, preference, request, payload).await;

        let entry = match &result {
            Ok(()) => NewNotificationLog::sent(request, channel, payload.is_priority),
            Err(error) => {
                NewNotificationLog::failed(request, channel, payload.is_priority, error.clone())
            }
        };
        if let Err(e) = self.recorder.record(&entry).await {
            tracing::warn!(channel = %channel, error = %e, "Failed to write channel log entry");
        }

        ChannelOutcome {
            channel,
            error: result.err(),
        }
    }

    async fn attempt(
        &self,
        channel: Channel,
        preference: &NotificationPreference,
        request: &NotificationRequest,
        payload: &NotificationPayload,
    ) -> Result<(), String> {
        let Some(sender) = self.senders.get(channel) else {
            return Err(NOT_CONFIGURED.to_string());
        };

        let (destination, subscription_id) = self.destination(channel, preference, request).await?;

        let sent = match tokio::time::timeout(self.channel_timeout, sender.send(&destination, payload))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.channel_timeout)),
        };

        match sent {
            Ok(receipt) => {
                if let Some(id) = subscription_id {
                    if let Err(e) = self.subscriptions.record_success(id).await {
                        tracing::warn!(subscription_id = id, error = %e, "Failed to stamp last use");
                    }
                }
                tracing::debug!(channel = %channel, status = ?receipt.status_code, "Channel delivered");
                Ok(())
            }
            Err(e) => {
                if let (DeliveryError::Gone { status }, Destination::Push(target)) = (&e, &destination) {
                    if let Err(err) = self
                        .subscriptions
                        .report_delivery_failure(&target.endpoint, *status)
                        .await
                    {
                        tracing::warn!(error = %err, "Failed to expire push subscription");
                    }
                }
                tracing::warn!(
                    account_id = %request.account_id,
                    channel = %channel,
                    error = %e,
                    "Channel delivery failed",
                );
                Err(e.to_string())
            }
        }
    }

    async fn destination(
        &self,
        channel: Channel,
        preference: &NotificationPreference,
        request: &NotificationRequest,
    ) -> Result<(Destination, Option<DbId>), String> {
        match channel {
            Channel::Push => {
                match self
                    .subscriptions
                    .get_active(&request.account_id, &request.user_id)
                    .await
                {
                    Ok(Some(sub)) => Ok((Destination::Push(sub.target()), Some(sub.id))),
                    Ok(None) => Err(NO_ACTIVE_SUBSCRIPTION.to_string()),
                    Err(e) => Err(format!("Subscription lookup failed: {e}")),
                }
            }
            Channel::Email | Channel::Slack | Channel::None => direct_target(channel, preference)
                .map(|destination| (destination, None))
                .ok_or_else(|| NOT_CONFIGURED.to_string()),
        }
    }
}

/// Destination stored on the preference itself (email address, Slack
/// webhook). Push targets live in the subscription store instead.
fn direct_target(channel: Channel, preference: &NotificationPreference) -> Option<Destination> {
    match channel {
        Channel::Email => non_blank(preference.channels.email.address.as_deref())
            .map(|address| Destination::Email(address.to_string())),
        Channel::Slack => non_blank(preference.channels.slack.webhook_url.as_deref())
            .map(|url| Destination::Slack(url.to_string())),
        Channel::Push | Channel::None => None,
    }
}

fn is_addressable(channel: Channel, preference: &NotificationPreference) -> bool {
    match channel {
        Channel::Email | Channel::Slack => direct_target(channel, preference).is_some(),
        Channel::Push | Channel::None => true,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
