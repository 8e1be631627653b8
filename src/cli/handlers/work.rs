//! Work command handler
//!
//! Handles the work command including dry-run validation and worker startup.

use crate::config::settings::{QueueBackend, Settings};
use crate::error::AppResult;
use crate::worker::Worker;

/// Handler for the work command
pub struct WorkCommandHandler {
    config: Settings,
}

impl WorkCommandHandler {
    /// Create a new work command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the work command with optional dry-run support
    ///
    /// # Errors
    /// - Configuration validation errors
    /// - Store connection or consumer failures (if not dry-run)
    pub async fn execute(&self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }

        self.validate_configuration()?;
        if self.config.queue.backend == QueueBackend::Memory {
            tracing::warn!(
                "Using the in-memory queue backend; messages are lost when the worker exits"
            );
        }

        Worker::new(self.config.clone()).run().await?;
        Ok(())
    }

    /// Validate configuration without starting the worker
    pub fn validate_only(&self) -> AppResult<()> {
        self.validate_configuration()?;

        let queue = &self.config.queue;
        println!("✓ Configuration is valid");
        println!("✓ Queue backend: {:?}", queue.backend);
        if queue.backend == QueueBackend::Redis {
            println!("✓ Redis URL is configured");
        }
        println!(
            "✓ Queue namespace '{}' with {} consumer(s), {}s wait window",
            queue.namespace, queue.consumers, queue.wait_seconds
        );
        println!(
            "✓ {} cron entr{} configured",
            self.config.jobs.cron_entries.len(),
            if self.config.jobs.cron_entries.len() == 1 { "y" } else { "ies" }
        );
        println!("✓ Logger configuration is valid");

        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    fn validate_configuration(&self) -> AppResult<()> {
        self.config.validate().map_err(Into::into)
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}
