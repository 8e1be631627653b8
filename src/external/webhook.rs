use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::client::build_http_client;
use crate::jobs::tasks::WebhookTransport;
use crate::jobs::types::JobContext;

/// Delivers webhooks over HTTP. Any non-2xx response is a failed attempt.
#[derive(Clone)]
pub struct HttpWebhookTransport {
    client: reqwest::Client,
}

impl HttpWebhookTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = build_http_client(timeout).context("failed to build webhook HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn post(
        &self,
        ctx: &JobContext,
        url: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> anyhow::Result<()> {
        let mut request = self.client.post(url).body(body.to_vec());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = tokio::select! {
            response = request.send() => response.with_context(|| format!("POST {url} failed"))?,
            _ = ctx.cancellation_token.cancelled() => anyhow::bail!("POST {url} cancelled"),
        };

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("POST {url} returned {status}");
        }

        tracing::debug!(message_id = %ctx.message_id, url = %url, status = %status, "Webhook delivered");
        Ok(())
    }
}
