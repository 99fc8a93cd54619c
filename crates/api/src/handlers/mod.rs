pub mod notifications;
pub mod settings;
pub mod subscriptions;
pub mod webhooks;
