//! Webhook receiver: accepts SNS HTTP deliveries, confirms subscriptions
//! and downloads notified objects that pass the filter.

pub mod config;
pub mod server;

pub use config::Args;
pub use server::{build_router, start_server, ServerState};
