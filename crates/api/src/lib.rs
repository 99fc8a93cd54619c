//! NotifyPro API server library.
//!
//! Exposes the building blocks (config, state, error handling, webhook
//! ingestion, routes) so integration tests and the binary entrypoint share
//! them.

pub mod config;
pub mod contacts;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
