use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::json;
use uuid::Uuid;

use crate::config::settings::CronEntry;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::queue::EnqueueFn;
use crate::jobs::types::{JobContext, JobHandler, Message, RegisteredJob};

pub const SCHEDULER_BOOTSTRAP_JOB: &str = "scheduler_bootstrap";

/// Callback fired by the cron engine on every tick of a schedule.
pub type CronCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Source of cron entries, usually backed by process configuration.
pub type CronEntriesLoader = Arc<dyn Fn() -> Vec<CronEntry> + Send + Sync>;

/// Time-based trigger engine.
#[async_trait]
pub trait CronEngine: Send + Sync {
    /// Install `callback` under `spec`. Fails on an invalid cron expression.
    async fn add(&self, spec: &str, callback: CronCallback) -> JobResult<Uuid>;
}

/// Installs configured cron schedules that enqueue ordinary messages.
///
/// Meant to run once at worker startup. Entries missing a spec or a job name
/// are skipped silently. Each scheduled firing enqueues with no link to the
/// bootstrap message's own context.
pub struct SchedulerBootstrapTask {
    cron: Option<Arc<dyn CronEngine>>,
    loader: CronEntriesLoader,
    enqueue: Option<EnqueueFn>,
}

impl SchedulerBootstrapTask {
    pub fn new(
        cron: Option<Arc<dyn CronEngine>>,
        loader: CronEntriesLoader,
        enqueue: Option<EnqueueFn>,
    ) -> Self {
        Self {
            cron,
            loader,
            enqueue,
        }
    }

    pub fn job(
        cron: Option<Arc<dyn CronEngine>>,
        loader: CronEntriesLoader,
        enqueue: Option<EnqueueFn>,
    ) -> RegisteredJob {
        RegisteredJob::new(
            SCHEDULER_BOOTSTRAP_JOB,
            Arc::new(Self::new(cron, loader, enqueue)),
        )
        .with_max_retries(1)
    }
}

fn enqueue_callback(enqueue: EnqueueFn, entry: CronEntry) -> CronCallback {
    Arc::new(move || {
        let enqueue = Arc::clone(&enqueue);
        let entry = entry.clone();
        async move {
            match enqueue(entry.job.clone(), entry.payload.clone()).await {
                Ok(message) => tracing::debug!(
                    schedule = %entry.name,
                    job = %entry.job,
                    message_id = %message.id,
                    "Scheduled job enqueued"
                ),
                Err(e) => tracing::error!(
                    schedule = %entry.name,
                    job = %entry.job,
                    error = %e,
                    "Failed to enqueue scheduled job"
                ),
            }
        }
        .boxed()
    })
}

#[async_trait]
impl JobHandler for SchedulerBootstrapTask {
    async fn handle(&self, _ctx: &JobContext, message: &mut Message) -> JobResult<()> {
        let (Some(cron), Some(enqueue)) = (&self.cron, &self.enqueue) else {
            return Err(JobError::Scheduler("scheduler dependencies missing".to_string()));
        };

        let mut scheduled = 0usize;
        for entry in (self.loader)() {
            if entry.spec.is_empty() || entry.job.is_empty() {
                continue;
            }
            let spec = entry.spec.clone();
            let name = entry.name.clone();
            let job = entry.job.clone();

            let id = cron
                .add(&spec, enqueue_callback(Arc::clone(enqueue), entry))
                .await?;
            tracing::info!(schedule = %name, spec = %spec, job = %job, cron_id = %id, "Schedule installed");
            scheduled += 1;
        }

        message.metadata.insert("scheduled".into(), json!(scheduled));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::queue::{JobQueue, QueueOptions};
    use crate::jobs::store::{ListStore, MemoryListStore};
    use crate::jobs::types::Payload;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CapturingCron {
        installed: Mutex<Vec<(String, CronCallback)>>,
    }

    impl CapturingCron {
        fn callbacks(&self) -> Vec<(String, CronCallback)> {
            self.installed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CronEngine for CapturingCron {
        async fn add(&self, spec: &str, callback: CronCallback) -> JobResult<Uuid> {
            if spec == "not a cron" {
                return Err(JobError::InvalidCronExpression(spec.to_string()));
            }
            self.installed
                .lock()
                .unwrap()
                .push((spec.to_string(), callback));
            Ok(Uuid::new_v4())
        }
    }

    struct Noop;

    #[async_trait]
    impl JobHandler for Noop {
        async fn handle(&self, _ctx: &JobContext, _message: &mut Message) -> JobResult<()> {
            Ok(())
        }
    }

    fn entry(spec: &str, job: &str) -> CronEntry {
        CronEntry {
            name: format!("{job}-schedule"),
            spec: spec.to_string(),
            job: job.to_string(),
            payload: Payload::new(),
        }
    }

    fn queue_with(jobs: &[&str]) -> (Arc<JobQueue>, Arc<MemoryListStore>) {
        let store = Arc::new(MemoryListStore::new());
        let queue = Arc::new(JobQueue::new(
            store.clone(),
            QueueOptions {
                namespace: "boot".to_string(),
                wait_time: Duration::from_millis(20),
            },
        ));
        for job in jobs {
            queue.register(RegisteredJob::new(*job, Arc::new(Noop))).unwrap();
        }
        (queue, store)
    }

    async fn pop_job(store: &MemoryListStore) -> String {
        let raw = store
            .pop_front_blocking("boot:main", Duration::from_millis(20))
            .await
            .unwrap()
            .expect("a message should be queued");
        Message::from_json(&raw).unwrap().job
    }

    fn bootstrap(
        cron: &Arc<CapturingCron>,
        queue: &Arc<JobQueue>,
        entries: Vec<CronEntry>,
    ) -> SchedulerBootstrapTask {
        let loader: CronEntriesLoader = Arc::new(move || entries.clone());
        let cron: Arc<dyn CronEngine> = cron.clone();
        SchedulerBootstrapTask::new(Some(cron), loader, Some(queue.enqueue_fn()))
    }

    fn bootstrap_message() -> Message {
        Message::new(SCHEDULER_BOOTSTRAP_JOB, Payload::new(), 1)
    }

    #[tokio::test]
    async fn test_installs_schedule_that_enqueues_target_job() {
        let cron = Arc::new(CapturingCron::default());
        let (queue, store) = queue_with(&["send_digest"]);
        let task = bootstrap(&cron, &queue, vec![entry("* * * * *", "send_digest")]);
        let mut msg = bootstrap_message();

        task.handle(&JobContext::detached(&msg), &mut msg).await.unwrap();
        assert_eq!(msg.metadata["scheduled"], json!(1));

        let callbacks = cron.callbacks();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(callbacks[0].0, "* * * * *");

        (callbacks[0].1)().await;
        assert_eq!(queue.pending().await.unwrap(), 1);

        assert_eq!(pop_job(&store).await, "send_digest");
    }

    #[tokio::test]
    async fn test_each_callback_enqueues_its_own_job() {
        let cron = Arc::new(CapturingCron::default());
        let (queue, store) = queue_with(&["alpha", "beta", "gamma"]);
        let task = bootstrap(
            &cron,
            &queue,
            vec![
                entry("0 * * * *", "alpha"),
                entry("5 * * * *", "beta"),
                entry("10 * * * *", "gamma"),
            ],
        );
        let mut msg = bootstrap_message();
        task.handle(&JobContext::detached(&msg), &mut msg).await.unwrap();
        assert_eq!(msg.metadata["scheduled"], json!(3));

        // Fire in reverse order to make sure nothing is shared between closures.
        let mut fired = Vec::new();
        for (_, callback) in cron.callbacks().into_iter().rev() {
            callback().await;
            fired.push(pop_job(&store).await);
        }
        assert_eq!(fired, vec!["gamma", "beta", "alpha"]);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let cron = Arc::new(CapturingCron::default());
        let (queue, _store) = queue_with(&["send_digest"]);
        let task = bootstrap(
            &cron,
            &queue,
            vec![entry("", "send_digest"), entry("* * * * *", "")],
        );
        let mut msg = bootstrap_message();

        task.handle(&JobContext::detached(&msg), &mut msg).await.unwrap();

        assert_eq!(msg.metadata["scheduled"], json!(0));
        assert!(cron.callbacks().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_spec_fails_the_handler() {
        let cron = Arc::new(CapturingCron::default());
        let (queue, _store) = queue_with(&["send_digest"]);
        let task = bootstrap(&cron, &queue, vec![entry("not a cron", "send_digest")]);
        let mut msg = bootstrap_message();

        let err = task
            .handle(&JobContext::detached(&msg), &mut msg)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidCronExpression(_)));
    }

    #[tokio::test]
    async fn test_missing_dependencies_fail() {
        let loader: CronEntriesLoader = Arc::new(Vec::new);
        let task = SchedulerBootstrapTask::new(None, loader.clone(), None);
        let mut msg = bootstrap_message();
        let err = task
            .handle(&JobContext::detached(&msg), &mut msg)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Scheduler(_)));

        let cron: Arc<dyn CronEngine> = Arc::new(CapturingCron::default());
        let task = SchedulerBootstrapTask::new(Some(cron), loader, None);
        assert!(task.handle(&JobContext::detached(&msg), &mut msg).await.is_err());
    }

    #[tokio::test]
    async fn test_callback_for_unregistered_job_does_not_enqueue() {
        let cron = Arc::new(CapturingCron::default());
        let (queue, _store) = queue_with(&[]);
        let task = bootstrap(&cron, &queue, vec![entry("* * * * *", "ghost")]);
        let mut msg = bootstrap_message();
        task.handle(&JobContext::detached(&msg), &mut msg).await.unwrap();

        (cron.callbacks()[0].1)().await;
        assert_eq!(queue.pending().await.unwrap(), 0);
    }
}
