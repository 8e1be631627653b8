use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::jobs::error::JobResult;

/// Open key/value map carried by messages.
pub type Payload = Map<String, JsonValue>;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Serialized unit of work stored in the backing lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub job: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub max_retries: u32,
    pub enqueued_at: Timestamp,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Payload,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_error: String,
}

impl Message {
    /// Build a fresh envelope for `job` with a new ID and no recorded failures.
    pub fn new(job: impl Into<String>, payload: Payload, max_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job: job.into(),
            payload,
            attempts: 0,
            max_retries,
            enqueued_at: Timestamp::now(),
            metadata: Payload::new(),
            last_error: String::new(),
        }
    }

    /// Wrap raw store content that could not be decoded so it can be dead-lettered.
    pub fn undecodable(raw: &str, error: impl fmt::Display) -> Self {
        let mut payload = Payload::new();
        payload.insert("raw".to_string(), JsonValue::String(raw.to_string()));
        let mut message = Self::new(String::new(), payload, 0);
        message.last_error = error.to_string();
        message
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Record a failed execution.
    pub fn record_failure(&mut self, error: impl fmt::Display) {
        self.attempts += 1;
        self.last_error = error.to_string();
    }

    /// Whether the retry budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }

    /// Read a string payload field, treating empty strings as missing.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(JsonValue::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Execution context handed to job handlers.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub message_id: String,
    pub job_name: String,
    pub attempt: u32,
    pub deadline: Instant,
    pub cancellation_token: CancellationToken,
}

impl JobContext {
    pub fn new(message: &Message, timeout: Duration, parent: &CancellationToken) -> Self {
        Self {
            message_id: message.id.clone(),
            job_name: message.job.clone(),
            attempt: message.attempts + 1,
            deadline: Instant::now() + timeout,
            cancellation_token: parent.child_token(),
        }
    }

    /// A context with no parent and a default deadline, for callers outside the consume loop.
    pub fn detached(message: &Message) -> Self {
        Self::new(message, DEFAULT_TIMEOUT, &CancellationToken::new())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Resolves once the handler should stop: either cancelled or past its deadline.
    pub async fn done(&self) {
        tokio::select! {
            _ = self.cancellation_token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }
}

/// Contract every job handler satisfies.
///
/// Handlers receive the message by mutable reference so they can record
/// audit details in `metadata`. Returning an error feeds retry accounting.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, ctx: &JobContext, message: &mut Message) -> JobResult<()>;
}

/// Registry entry: handler plus retry/timeout policy.
///
/// A zero `max_retries` or `timeout` means "use the default" and is filled in
/// at registration time.
#[derive(Clone)]
pub struct RegisteredJob {
    pub name: String,
    pub handler: Option<Arc<dyn JobHandler>>,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl RegisteredJob {
    pub fn new(name: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            name: name.into(),
            handler: Some(handler),
            max_retries: 0,
            timeout: Duration::ZERO,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for RegisteredJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredJob")
            .field("name", &self.name)
            .field("has_handler", &self.handler.is_some())
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}
