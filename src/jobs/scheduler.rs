use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};
use uuid::Uuid;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::tasks::{CronCallback, CronEngine};

/// Cron engine backed by tokio-cron-scheduler.
///
/// The owning process drives the lifecycle with `start` and `stop`;
/// schedules may be added before or after `start`.
#[derive(Clone)]
pub struct CronScheduler {
    scheduler: Arc<Mutex<TokioCronScheduler>>,
}

impl CronScheduler {
    pub async fn new() -> JobResult<Self> {
        let scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
        })
    }

    /// Start firing installed schedules.
    pub async fn start(&self) -> JobResult<()> {
        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&self) -> JobResult<()> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))
    }
}

/// Classic five-field specs (minute first) gain a leading seconds field.
pub fn normalize_spec(spec: &str) -> String {
    let spec = spec.trim();
    if spec.split_whitespace().count() == 5 {
        format!("0 {spec}")
    } else {
        spec.to_string()
    }
}

#[async_trait]
impl CronEngine for CronScheduler {
    async fn add(&self, spec: &str, callback: CronCallback) -> JobResult<Uuid> {
        let normalized = normalize_spec(spec);
        let cron_job = Job::new_async(normalized.as_str(), move |_uuid, _lock| callback())
            .map_err(|e| JobError::InvalidCronExpression(format!("{spec}: {e}")))?;

        self.scheduler
            .lock()
            .await
            .add(cron_job)
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))
    }
}
