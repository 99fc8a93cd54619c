//! NotifyPro delivery infrastructure.
//!
//! - [`delivery`]: channel senders (Web Push, SMTP email, Slack webhook)
//!   behind the uniform [`ChannelSender`] contract.
//! - [`queue`]: the durable priority job queue port with Postgres and
//!   in-memory implementations.
//! - [`store`]: persistence ports for preferences, push subscriptions and
//!   the notification log, again with Postgres and in-memory backends.
//! - [`PushSubscriptionManager`]: single-active-device lifecycle.
//! - [`NotificationLogRecorder`]: append-only delivery audit.

pub mod delivery;
pub mod queue;
pub mod recorder;
pub mod store;
pub mod subscriptions;

pub use delivery::email::{EmailConfig, EmailSender};
pub use delivery::push::{WebPushConfig, WebPushSender};
pub use delivery::slack::SlackSender;
pub use delivery::{ChannelSender, DeliveryError, DeliveryReceipt, Destination, NotificationPayload};
pub use queue::memory::InMemoryJobQueue;
pub use queue::postgres::PgJobQueue;
pub use queue::{JobEnvelope, JobLease, JobQueue, QueueError};
pub use recorder::NotificationLogRecorder;
pub use store::memory::InMemoryStore;
pub use store::postgres::PgStore;
pub use store::{LogStore, PreferenceStore, StoreError, SubscriptionStore};
pub use subscriptions::{PushSubscriptionManager, SubscriptionError};
