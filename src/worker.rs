//! Worker process lifecycle
//!
//! Builds the queue and its store, registers the built-in jobs, starts the
//! cron engine and the consumer loops, and tears everything down on shutdown.

use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{Environment, settings::Settings};
use crate::external::{HttpWebhookTransport, LogFanoutNotifier, LogMailTransport};
use crate::jobs::error::JobResult;
use crate::jobs::queue::{JobQueue, QueueOptions};
use crate::jobs::scheduler::CronScheduler;
use crate::jobs::store;
use crate::jobs::tasks::bootstrap::SCHEDULER_BOOTSTRAP_JOB;
use crate::jobs::tasks::{
    CronEngine, CronEntriesLoader, EmailSendTask, NotificationFanoutTask, SchedulerBootstrapTask,
    WebhookDispatchTask,
};
use crate::jobs::types::Payload;

/// Connect to the configured store and build a queue with every built-in job
/// registered. `cron` is only needed by processes that run the bootstrap job.
pub async fn build_queue(
    settings: &Settings,
    cron: Option<Arc<dyn CronEngine>>,
) -> anyhow::Result<Arc<JobQueue>> {
    let store = store::connect(&settings.queue).await?;
    let queue = Arc::new(JobQueue::new(store, QueueOptions::from(&settings.queue)));
    register_jobs(&queue, settings, cron)?;
    Ok(queue)
}

/// Register the built-in jobs on `queue`.
pub fn register_jobs(
    queue: &Arc<JobQueue>,
    settings: &Settings,
    cron: Option<Arc<dyn CronEngine>>,
) -> anyhow::Result<()> {
    let webhook = HttpWebhookTransport::new(settings.webhook.timeout())?;

    let jobs = settings.jobs.clone();
    let loader: CronEntriesLoader = Arc::new(move || jobs.resolve_cron_entries());

    queue.register(EmailSendTask::job(Arc::new(LogMailTransport)))?;
    queue.register(WebhookDispatchTask::job(Arc::new(webhook)))?;
    queue.register(NotificationFanoutTask::job(Arc::new(LogFanoutNotifier)))?;
    queue.register(SchedulerBootstrapTask::job(
        cron,
        loader,
        Some(queue.enqueue_fn()),
    ))?;

    Ok(())
}

/// Worker process manager
pub struct Worker {
    settings: Settings,
}

impl Worker {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run until Ctrl+C/SIGTERM or until a consumer stops on a store failure.
    pub async fn run(self) -> anyhow::Result<()> {
        let running = self.start().await?;

        tokio::select! {
            _ = shutdown_signal() => {}
            _ = running.shutdown.cancelled() => {
                tracing::warn!("A consumer stopped unexpectedly, shutting down");
            }
        }

        running.stop().await
    }

    /// Bring up the store, queue, cron engine and consumer loops.
    pub async fn start(self) -> anyhow::Result<RunningWorker> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env(),
            "Worker starting"
        );
        tracing::info!(
            backend = ?self.settings.queue.backend,
            namespace = %self.settings.queue.namespace,
            wait_seconds = self.settings.queue.wait_seconds,
            consumers = self.settings.queue.consumers,
            "Queue configuration loaded"
        );

        let cron = CronScheduler::new().await?;
        let engine: Arc<dyn CronEngine> = Arc::new(cron.clone());
        let queue = build_queue(&self.settings, Some(engine)).await?;
        let job_names: Vec<String> = queue.jobs().into_iter().map(|job| job.name).collect();
        tracing::info!(jobs = ?job_names, "Jobs registered");

        if self.settings.jobs.bootstrap_on_start {
            let message = queue.enqueue(SCHEDULER_BOOTSTRAP_JOB, Payload::new()).await?;
            tracing::info!(message_id = %message.id, "Scheduler bootstrap enqueued");
        }

        cron.start().await?;

        let shutdown = CancellationToken::new();
        let mut consumers = JoinSet::new();
        for index in 0..self.settings.queue.consumers.max(1) {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            consumers.spawn(async move {
                let result = queue.consume(shutdown.clone()).await;
                if let Err(e) = &result {
                    tracing::error!(consumer = index, error = %e, "Consumer exited with error");
                    shutdown.cancel();
                }
                result
            });
        }
        tracing::info!(consumers = consumers.len(), "Worker started");

        Ok(RunningWorker {
            queue,
            cron,
            shutdown,
            consumers,
        })
    }
}

/// Handle to a started worker.
pub struct RunningWorker {
    queue: Arc<JobQueue>,
    cron: CronScheduler,
    shutdown: CancellationToken,
    consumers: JoinSet<JobResult<()>>,
}

impl RunningWorker {
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Cancel the consumers, wait for in-flight handlers, then stop cron.
    ///
    /// Returns the first consumer failure, if any.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();

        let mut first_error = None;
        while let Some(joined) = self.consumers.join_next().await {
            let outcome = match joined {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(e) => Err(anyhow::Error::from(e).context("consumer task panicked")),
            };
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.cron.stop().await {
            tracing::warn!(error = %e, "Cron scheduler did not stop cleanly");
        }
        tracing::info!("Worker shutdown complete");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
