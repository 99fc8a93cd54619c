#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notifypro_core::channels::Channel;
use notifypro_core::preferences::NotificationPreference;
use notifypro_core::request::{EventKind, NotificationRequest};
use notifypro_core::subscription::{DeviceInfo, PushKeys};
use notifypro_db::models::push_subscription::{NewPushSubscription, PushSubscription};
use notifypro_events::{
    ChannelSender, DeliveryError, DeliveryReceipt, Destination, InMemoryStore,
    NotificationLogRecorder, NotificationPayload, PreferenceStore, PushSubscriptionManager,
    SubscriptionStore,
};
use notifypro_worker::dispatcher::{ChannelSenders, NotificationDispatcher};

pub const ACCOUNT: &str = "loc-1";
pub const USER: &str = "user-1";
pub const ENDPOINT: &str = "https://push.example.com/sub/abc";
pub const SLACK_WEBHOOK: &str = "https://hooks.slack.com/services/T000/B000/XXXX";

/// How a [`ScriptedSender`] answers every send.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    Reject(u16),
    Gone(u16),
    Hang,
}

/// Channel sender that records calls and answers per its [`Behavior`].
pub struct ScriptedSender {
    channel: Channel,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl ScriptedSender {
    pub fn new(channel: Channel, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            channel,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        destination: &Destination,
        _payload: &NotificationPayload,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(destination.channel(), self.channel);
        match self.behavior {
            Behavior::Succeed => Ok(DeliveryReceipt {
                channel: self.channel,
                status_code: Some(201),
            }),
            Behavior::Reject(status) => Err(DeliveryError::Rejected {
                status,
                message: "backend unavailable".to_string(),
            }),
            Behavior::Gone(status) => Err(DeliveryError::Gone { status }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("hung sender must be timed out")
            }
        }
    }
}

pub fn request(text: &str) -> NotificationRequest {
    NotificationRequest {
        account_id: ACCOUNT.to_string(),
        user_id: USER.to_string(),
        contact_id: Some("contact-1".to_string()),
        conversation_id: Some("conv-1".to_string()),
        message_id: Some("msg-1".to_string()),
        message_text: text.to_string(),
        contact_name: "Ada Lovelace".to_string(),
        event: EventKind::InboundMessage,
    }
}

/// Account-wide preferences with push and slack on, email off.
pub fn push_and_slack() -> NotificationPreference {
    let mut pref = NotificationPreference::new(ACCOUNT, None);
    pref.channels.push.enabled = true;
    pref.channels.slack.enabled = true;
    pref.channels.slack.webhook_url = Some(SLACK_WEBHOOK.to_string());
    pref
}

pub async fn save_preference(store: &InMemoryStore, pref: &NotificationPreference) {
    PreferenceStore::save(store, pref).await.unwrap();
}

pub async fn subscribe_device(store: &InMemoryStore, endpoint: &str) -> PushSubscription {
    SubscriptionStore::subscribe(
        store,
        &NewPushSubscription {
            account_id: ACCOUNT.to_string(),
            user_id: USER.to_string(),
            endpoint: endpoint.to_string(),
            keys: PushKeys {
                p256dh: "p256dh".to_string(),
                auth: "auth".to_string(),
            },
            device: DeviceInfo::default(),
        },
    )
    .await
    .unwrap()
}

pub fn dispatcher(store: &InMemoryStore, senders: ChannelSenders) -> NotificationDispatcher {
    dispatcher_with_timeout(store, senders, Duration::from_secs(5))
}

pub fn dispatcher_with_timeout(
    store: &InMemoryStore,
    senders: ChannelSenders,
    timeout: Duration,
) -> NotificationDispatcher {
    let shared = Arc::new(store.clone());
    NotificationDispatcher::new(
        shared.clone(),
        PushSubscriptionManager::new(shared.clone()),
        NotificationLogRecorder::new(shared),
        senders,
        "https://app.example.com",
        timeout,
    )
}
