use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobContext, JobHandler, Message, RegisteredJob};

pub const EMAIL_SEND_JOB: &str = "email_send";

/// Delivery mechanism for outgoing email.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, ctx: &JobContext, to: &str, subject: &str, body: &str)
    -> anyhow::Result<()>;
}

/// Sends one email per message.
///
/// Payload: `to` and `subject` are required strings, `body` is optional.
pub struct EmailSendTask {
    sender: Arc<dyn MailTransport>,
}

impl EmailSendTask {
    pub fn new(sender: Arc<dyn MailTransport>) -> Self {
        Self { sender }
    }

    pub fn job(sender: Arc<dyn MailTransport>) -> RegisteredJob {
        RegisteredJob::new(EMAIL_SEND_JOB, Arc::new(Self::new(sender)))
            .with_max_retries(5)
            .with_timeout(Duration::from_secs(45))
    }
}

#[async_trait]
impl JobHandler for EmailSendTask {
    async fn handle(&self, ctx: &JobContext, message: &mut Message) -> JobResult<()> {
        let (Some(to), Some(subject)) = (message.payload_str("to"), message.payload_str("subject"))
        else {
            return Err(JobError::invalid_payload("missing email fields (to, subject)"));
        };
        let to = to.to_string();
        let subject = subject.to_string();
        let body = message.payload_str("body").unwrap_or_default().to_string();

        self.sender
            .send(ctx, &to, &subject, &body)
            .await
            .map_err(|e| JobError::Transport(format!("{e:#}")))?;

        message.metadata.insert("to".into(), json!(to));
        message.metadata.insert("subject".into(), json!(subject));
        message.metadata.insert("status".into(), json!("sent"));
        Ok(())
    }
}
