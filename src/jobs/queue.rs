use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::config::settings::QueueConfig;
use crate::jobs::dead_letter::DeadLetterStore;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::registry::JobRegistry;
use crate::jobs::store::ListStore;
use crate::jobs::types::{JobContext, Message, Payload, RegisteredJob};

const DEFAULT_NAMESPACE: &str = "jobs";
const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(5);

pub type EnqueueFuture = BoxFuture<'static, JobResult<Message>>;

/// Detached enqueue capability handed to components that outlive a request,
/// such as cron callbacks.
pub type EnqueueFn = Arc<dyn Fn(String, Payload) -> EnqueueFuture + Send + Sync>;

/// Queue construction options.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Key prefix; lists live at `{namespace}:main` and `{namespace}:dlq`.
    pub namespace: String,
    /// Upper bound on one blocking pop, which is also how quickly `consume`
    /// notices cancellation while idle.
    pub wait_time: Duration,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            wait_time: DEFAULT_WAIT_TIME,
        }
    }
}

impl From<&QueueConfig> for QueueOptions {
    fn from(config: &QueueConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            wait_time: Duration::from_secs(config.wait_seconds),
        }
    }
}

/// Durable FIFO job queue with retries and dead-lettering.
///
/// Producers append to the tail of the main list and consumers pop from its
/// head. Several `consume` loops, in this process or others, may share the
/// same keys; the store's atomic pop is the only coordination.
///
/// Delivery is at-most-once: a message popped by a consumer that crashes
/// before its handler finishes is lost.
pub struct JobQueue {
    store: Arc<dyn ListStore>,
    registry: JobRegistry,
    dead_letters: DeadLetterStore,
    queue_key: String,
    wait_time: Duration,
}

impl JobQueue {
    pub fn new(store: Arc<dyn ListStore>, options: QueueOptions) -> Self {
        let namespace = if options.namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            options.namespace
        };
        let wait_time = if options.wait_time.is_zero() {
            DEFAULT_WAIT_TIME
        } else {
            options.wait_time
        };

        Self {
            dead_letters: DeadLetterStore::new(Arc::clone(&store), format!("{namespace}:dlq")),
            queue_key: format!("{namespace}:main"),
            registry: JobRegistry::new(),
            store,
            wait_time,
        }
    }

    /// Register a job handler with this queue's registry.
    pub fn register(&self, job: RegisteredJob) -> JobResult<()> {
        let name = job.name.clone();
        self.registry.register(job)?;
        tracing::debug!(job = %name, "Job registered");
        Ok(())
    }

    /// Registered jobs, for worker bootstrap and diagnostics.
    pub fn jobs(&self) -> Vec<RegisteredJob> {
        self.registry.list()
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    pub fn dead_letters(&self) -> &DeadLetterStore {
        &self.dead_letters
    }

    /// Append a new message for `job_name` to the tail of the main list.
    pub async fn enqueue(&self, job_name: &str, payload: Payload) -> JobResult<Message> {
        let job = self
            .registry
            .get(job_name)
            .ok_or_else(|| JobError::NotRegistered(job_name.to_string()))?;

        let message = Message::new(job_name, payload, job.max_retries);
        let encoded = message.to_json()?;
        self.store.push_back(&self.queue_key, encoded).await?;

        tracing::debug!(message_id = %message.id, job = %message.job, "Message enqueued");
        Ok(message)
    }

    /// An enqueue closure that does not keep the queue alive.
    pub fn enqueue_fn(self: &Arc<Self>) -> EnqueueFn {
        let queue = Arc::downgrade(self);
        Arc::new(move |job_name: String, payload: Payload| {
            let queue = queue.clone();
            async move {
                let queue = queue
                    .upgrade()
                    .ok_or_else(|| JobError::Scheduler("job queue has been shut down".to_string()))?;
                queue.enqueue(&job_name, payload).await
            }
            .boxed()
        })
    }

    /// Dead-letter entries, oldest first, without removing them.
    pub async fn read_dlq(&self, limit: usize) -> JobResult<Vec<Message>> {
        self.dead_letters.peek(limit).await
    }

    /// Number of messages waiting in the main list.
    pub async fn pending(&self) -> JobResult<usize> {
        Ok(self.store.len(&self.queue_key).await?)
    }

    /// Process messages until `shutdown` is cancelled or the store fails.
    ///
    /// Per-message failures never surface here; they are recorded on the
    /// message and drive the retry/dead-letter decision. A handler in flight
    /// when `shutdown` fires sees its context cancelled and is allowed to
    /// return before the loop exits.
    ///
    /// The per-job timeout is enforced, not advisory: when it expires the
    /// handler's context is cancelled and its future is dropped at the next
    /// await point, even if it never checks the context. A handler with
    /// non-idempotent side effects can therefore be cut off midway and then
    /// retried, so such handlers must tolerate a partial earlier attempt.
    pub async fn consume(&self, shutdown: CancellationToken) -> JobResult<()> {
        tracing::info!(queue = %self.queue_key, "Consumer started");
        loop {
            if shutdown.is_cancelled() {
                tracing::info!(queue = %self.queue_key, "Consumer stopped");
                return Ok(());
            }

            match self.process_next(&shutdown).await {
                Ok(_) => {}
                Err(JobError::Store(e)) if e.is_transient() => {
                    tracing::debug!(error = %e, "Transient store error, retrying pop");
                }
                Err(e) => {
                    tracing::error!(queue = %self.queue_key, error = %e, "Consumer failed");
                    return Err(e);
                }
            }
        }
    }

    /// Pop and handle at most one message. Returns whether a message was taken.
    pub async fn process_next(&self, shutdown: &CancellationToken) -> JobResult<bool> {
        let Some(raw) = self
            .store
            .pop_front_blocking(&self.queue_key, self.wait_time)
            .await?
        else {
            return Ok(false);
        };

        self.process(&raw, shutdown).await;
        Ok(true)
    }

    async fn process(&self, raw: &str, shutdown: &CancellationToken) {
        let mut message = match Message::from_json(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable message, dead-lettering");
                self.move_to_dlq(&Message::undecodable(raw, e)).await;
                return;
            }
        };

        let Some(job) = self.registry.get(&message.job) else {
            tracing::warn!(message_id = %message.id, job = %message.job, "Unregistered job, dead-lettering");
            message.last_error = "unregistered job".to_string();
            self.move_to_dlq(&message).await;
            return;
        };

        match self.execute(&job, &mut message, shutdown).await {
            Ok(()) => {
                tracing::info!(
                    message_id = %message.id,
                    job = %message.job,
                    attempts = message.attempts,
                    "Job completed"
                );
            }
            Err(e) => self.handle_failure(message, e).await,
        }
    }

    async fn execute(
        &self,
        job: &RegisteredJob,
        message: &mut Message,
        shutdown: &CancellationToken,
    ) -> JobResult<()> {
        let handler = job
            .handler
            .clone()
            .ok_or_else(|| JobError::InvalidJob(format!("job {} has no handler", job.name)))?;

        let ctx = JobContext::new(message, job.timeout, shutdown);
        match tokio::time::timeout(job.timeout, handler.handle(&ctx, message)).await {
            Ok(result) => result,
            Err(_) => {
                ctx.cancellation_token.cancel();
                Err(JobError::Timeout(job.timeout))
            }
        }
    }

    async fn handle_failure(&self, mut message: Message, error: JobError) {
        message.record_failure(&error);

        if message.is_exhausted() {
            tracing::warn!(
                message_id = %message.id,
                job = %message.job,
                attempts = message.attempts,
                error = %error,
                "Retries exhausted, dead-lettering"
            );
            self.move_to_dlq(&message).await;
            return;
        }

        tracing::warn!(
            message_id = %message.id,
            job = %message.job,
            attempts = message.attempts,
            max_retries = message.max_retries,
            error = %error,
            "Job failed, requeueing"
        );
        if let Err(e) = self.requeue(&message).await {
            message.last_error = format!("requeue failed: {e}");
            self.move_to_dlq(&message).await;
        }
    }

    /// Push a failed message back onto the tail for another attempt.
    async fn requeue(&self, message: &Message) -> JobResult<()> {
        let encoded = message.to_json()?;
        self.store.push_back(&self.queue_key, encoded).await?;
        Ok(())
    }

    /// Best-effort dead-letter write; a failure here is logged, not propagated.
    async fn move_to_dlq(&self, message: &Message) {
        if let Err(e) = self.dead_letters.append(message).await {
            tracing::error!(
                message_id = %message.id,
                job = %message.job,
                last_error = %message.last_error,
                error = %e,
                "Failed to write dead-letter entry"
            );
        }
    }
}
