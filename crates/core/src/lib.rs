//! NotifyPro domain core.
//!
//! Pure domain types and decision logic with no I/O. Everything here is
//! shared by the database layer, the delivery channels, the dispatch worker,
//! and the HTTP boundary.

pub mod channels;
pub mod error;
pub mod filter;
pub mod log;
pub mod preferences;
pub mod request;
pub mod subscription;
pub mod types;
