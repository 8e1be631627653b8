//! Concrete job handlers.
//!
//! Each handler owns the narrow transport it needs, injected at construction,
//! and exposes a `job()` constructor returning a ready-to-register entry.

pub mod bootstrap;
pub mod email;
pub mod notification;
pub mod webhook;

pub use bootstrap::{CronCallback, CronEngine, CronEntriesLoader, SchedulerBootstrapTask};
pub use email::{EmailSendTask, MailTransport};
pub use notification::{FanoutNotifier, NotificationFanoutTask};
pub use webhook::{WebhookDispatchTask, WebhookTransport};
