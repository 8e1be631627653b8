//! Enqueue command handler

use std::sync::Arc;

use crate::config::settings::{QueueBackend, Settings};
use crate::error::{AppError, AppResult};
use crate::jobs::queue::JobQueue;
use crate::jobs::types::{Message, Payload};
use crate::worker::build_queue;

/// Handler for the enqueue command
pub struct EnqueueCommandHandler {
    config: Settings,
}

impl EnqueueCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Push one message onto the configured queue and print it as JSON.
    pub async fn execute(&self, job: &str, payload: Option<Payload>) -> AppResult<Message> {
        if self.config.queue.backend == QueueBackend::Memory {
            tracing::warn!(
                "The in-memory backend is private to this process; the message will not reach a worker"
            );
        }

        let queue = build_queue(&self.config, None).await?;
        let message = Self::enqueue(&queue, job, payload.unwrap_or_default()).await?;

        println!("{}", serde_json::to_string_pretty(&message).map_err(anyhow::Error::from)?);
        Ok(message)
    }

    /// Enqueue on an existing queue, mapping an unknown job name to a bad request.
    pub async fn enqueue(queue: &Arc<JobQueue>, job: &str, payload: Payload) -> AppResult<Message> {
        let job = job.trim();
        if job.is_empty() {
            return Err(AppError::BadRequest {
                message: "job name cannot be empty".to_string(),
            });
        }

        match queue.enqueue(job, payload).await {
            Ok(message) => {
                tracing::info!(message_id = %message.id, job = %message.job, "Message enqueued");
                Ok(message)
            }
            Err(crate::jobs::error::JobError::NotRegistered(name)) => {
                let known: Vec<String> = queue.jobs().into_iter().map(|j| j.name).collect();
                Err(AppError::BadRequest {
                    message: format!(
                        "job '{}' is not registered (known jobs: {})",
                        name,
                        known.join(", ")
                    ),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
