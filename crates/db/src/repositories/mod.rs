//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod notification_log_repo;
pub mod preference_repo;
pub mod push_subscription_repo;

pub use job_repo::JobRepo;
pub use notification_log_repo::NotificationLogRepo;
pub use preference_repo::PreferenceRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
