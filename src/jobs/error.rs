use std::time::Duration;

use thiserror::Error;

/// Errors raised by a list-store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store operation failed: {0}")]
    Operation(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),
}

impl StoreError {
    /// Transient errors are retried by the consume loop instead of stopping it.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Job {0} is not registered")]
    NotRegistered(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Job execution timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid cron expression: {0}")]
    InvalidCronExpression(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Free-form handler failure; displays the message verbatim.
    #[error("{0}")]
    Failed(String),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        JobError::Failed(message.into())
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        JobError::InvalidPayload(message.into())
    }
}

pub type JobResult<T> = Result<T, JobError>;
