use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, RegisteredJob};

/// Registry mapping job names to handlers and their retry/timeout policy.
///
/// The registry is local to one process. Every consumer sharing a queue
/// namespace must register the same set of jobs.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, RegisteredJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job, replacing any previous entry with the same name.
    pub fn register(&self, mut job: RegisteredJob) -> JobResult<()> {
        if job.name.is_empty() {
            return Err(JobError::InvalidJob("job name is required".to_string()));
        }
        if job.handler.is_none() {
            return Err(JobError::InvalidJob(format!(
                "job handler for {} cannot be empty",
                job.name
            )));
        }

        if job.max_retries == 0 {
            job.max_retries = DEFAULT_MAX_RETRIES;
        }
        if job.timeout == Duration::ZERO {
            job.timeout = DEFAULT_TIMEOUT;
        }

        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.name.clone(), job);
        Ok(())
    }

    /// Look up a job definition by name.
    pub fn get(&self, name: &str) -> Option<RegisteredJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of all registered jobs, sorted by name.
    pub fn list(&self) -> Vec<RegisteredJob> {
        let mut jobs: Vec<RegisteredJob> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        jobs
    }
}
