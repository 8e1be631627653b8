//! Outbound adapters for the job handlers' collaborator traits.

pub mod client;
pub mod logging;
pub mod webhook;

pub use logging::{LogFanoutNotifier, LogMailTransport};
pub use webhook::HttpWebhookTransport;
