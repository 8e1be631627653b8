use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::{Value as JsonValue, json};
use sha2::Sha256;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobContext, JobHandler, Message, RegisteredJob};

pub const WEBHOOK_DISPATCH_JOB: &str = "webhook_dispatch";
pub const SIGNATURE_HEADER: &str = "X-Signature";

type HmacSha256 = Hmac<Sha256>;

/// HTTP transport used to deliver webhooks.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(
        &self,
        ctx: &JobContext,
        url: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> anyhow::Result<()>;
}

/// Lowercase hex HMAC-SHA256 of `body` keyed by `secret`.
pub fn sign(secret: &str, body: &[u8]) -> JobResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| JobError::failed(format!("invalid signing key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Posts signed payloads to webhook endpoints.
///
/// Payload: `url` and `secret` strings plus a `body`. A string body is sent
/// verbatim; anything else is JSON-encoded. The signature covers the exact
/// bytes sent.
pub struct WebhookDispatchTask {
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookDispatchTask {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport }
    }

    pub fn job(transport: Arc<dyn WebhookTransport>) -> RegisteredJob {
        RegisteredJob::new(WEBHOOK_DISPATCH_JOB, Arc::new(Self::new(transport))).with_max_retries(4)
    }
}

#[async_trait]
impl JobHandler for WebhookDispatchTask {
    async fn handle(&self, ctx: &JobContext, message: &mut Message) -> JobResult<()> {
        let (Some(url), Some(secret), Some(body)) = (
            message.payload_str("url"),
            message.payload_str("secret"),
            message.payload.get("body"),
        ) else {
            return Err(JobError::invalid_payload("webhook requires url, secret and body"));
        };

        let body = match body {
            JsonValue::String(text) => text.clone().into_bytes(),
            other => serde_json::to_vec(other)?,
        };
        let signature = sign(secret, &body)?;
        let url = url.to_string();

        let headers = HashMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            (SIGNATURE_HEADER.to_string(), signature.clone()),
        ]);

        self.transport
            .post(ctx, &url, &headers, &body)
            .await
            .map_err(|e| JobError::Transport(format!("{e:#}")))?;

        message.metadata.insert("url".into(), json!(url));
        message.metadata.insert("signature".into(), json!(signature));
        Ok(())
    }
}
