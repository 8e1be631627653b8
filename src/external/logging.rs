//! Transports that only record what would have been delivered.
//!
//! The worker wires these in by default; deployments with a real mail relay or
//! push channel provide their own `MailTransport` / `FanoutNotifier`.

use async_trait::async_trait;

use crate::jobs::tasks::{FanoutNotifier, MailTransport};
use crate::jobs::types::JobContext;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(
        &self,
        ctx: &JobContext,
        to: &str,
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(
            message_id = %ctx.message_id,
            attempt = ctx.attempt,
            to = %to,
            subject = %subject,
            body_len = body.len(),
            "Email dispatched"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogFanoutNotifier;

#[async_trait]
impl FanoutNotifier for LogFanoutNotifier {
    async fn send_to_user(
        &self,
        ctx: &JobContext,
        user_id: &str,
        message: &str,
    ) -> anyhow::Result<()> {
        if ctx.is_cancelled() {
            anyhow::bail!("delivery to {user_id} cancelled");
        }
        tracing::info!(
            message_id = %ctx.message_id,
            user_id = %user_id,
            text = %message,
            "Notification delivered"
        );
        Ok(())
    }
}
