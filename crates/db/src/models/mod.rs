//! Row models.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus conversions into the core domain types where the
//! rest of the system works with those instead.

pub mod job;
pub mod notification_log;
pub mod preference;
pub mod push_subscription;
