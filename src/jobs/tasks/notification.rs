use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobContext, JobHandler, Message, RegisteredJob};

pub const NOTIFICATION_FANOUT_JOB: &str = "notification_fanout";

/// Pushes a notification to a single user.
#[async_trait]
pub trait FanoutNotifier: Send + Sync {
    async fn send_to_user(&self, ctx: &JobContext, user_id: &str, message: &str)
    -> anyhow::Result<()>;
}

/// Broadcasts a text to a list of users, one at a time.
///
/// Payload: `user_ids` (array) and `message` (string). Entries of `user_ids`
/// that are not non-empty strings are skipped.
pub struct NotificationFanoutTask {
    notifier: Arc<dyn FanoutNotifier>,
}

impl NotificationFanoutTask {
    pub fn new(notifier: Arc<dyn FanoutNotifier>) -> Self {
        Self { notifier }
    }

    pub fn job(notifier: Arc<dyn FanoutNotifier>) -> RegisteredJob {
        RegisteredJob::new(NOTIFICATION_FANOUT_JOB, Arc::new(Self::new(notifier)))
            .with_max_retries(2)
    }
}

#[async_trait]
impl JobHandler for NotificationFanoutTask {
    async fn handle(&self, ctx: &JobContext, message: &mut Message) -> JobResult<()> {
        let users: Vec<String> = match message.payload.get("user_ids") {
            Some(JsonValue::Array(values)) => values
                .iter()
                .filter_map(JsonValue::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            _ => return Err(JobError::invalid_payload("user_ids must be an array")),
        };
        let Some(text) = message.payload.get("message").and_then(JsonValue::as_str) else {
            return Err(JobError::invalid_payload("message must be a string"));
        };
        let text = text.to_string();

        let mut delivered = 0usize;
        for user_id in &users {
            self.notifier
                .send_to_user(ctx, user_id, &text)
                .await
                .map_err(|e| JobError::Transport(format!("notify {user_id}: {e:#}")))?;
            delivered += 1;
        }

        message.metadata.insert("delivered".into(), json!(delivered));
        message.metadata.insert("text".into(), json!(text));
        Ok(())
    }
}
