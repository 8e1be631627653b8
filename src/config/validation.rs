//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    FileSettings, JobsConfig, LoggerSettings, QueueBackend, QueueConfig, Settings, WebhookConfig,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl QueueConfig {
    /// Validate queue configuration
    ///
    /// # Validation Rules
    /// - Namespace must not be empty or contain whitespace
    /// - Wait window must be greater than 0
    /// - At least one consumer
    /// - Redis URL and pool size are checked only for the redis backend
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::validation(
                "queue.namespace",
                "Queue namespace cannot be empty.",
            ));
        }

        if self.namespace.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(
                "queue.namespace",
                "Queue namespace cannot contain whitespace.",
            ));
        }

        if self.wait_seconds == 0 {
            return Err(ConfigError::validation(
                "queue.wait_seconds",
                "Wait window must be greater than 0 seconds.",
            ));
        }

        if self.consumers == 0 {
            return Err(ConfigError::validation(
                "queue.consumers",
                "At least one consumer is required.",
            ));
        }

        if self.backend == QueueBackend::Redis {
            if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
                return Err(ConfigError::ValidationError {
                    field: "queue.redis.url".to_string(),
                    message: format!(
                        "Invalid Redis URL '{}'. Expected format: redis://[user:password@]host[:port][/db]",
                        self.redis.url
                    ),
                });
            }

            if self.redis.pool_size == 0 {
                return Err(ConfigError::validation(
                    "queue.redis.pool_size",
                    "Redis pool size must be greater than 0.",
                ));
            }
        }

        Ok(())
    }
}

impl JobsConfig {
    /// Cron entries never fail validation. Entries missing a spec or a job
    /// are skipped by `scheduler_bootstrap`; they are only reported here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, entry) in self.cron_entries.iter().enumerate() {
            if entry.spec.trim().is_empty() || entry.job.trim().is_empty() {
                tracing::warn!(
                    index,
                    name = %entry.name,
                    "Cron entry is missing a spec or a job and will be skipped"
                );
            }
        }
        Ok(())
    }
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "webhook.timeout_seconds",
                "Webhook timeout must be greater than 0 seconds.",
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.queue.validate()?;
        self.jobs.validate()?;
        self.webhook.validate()?;
        Ok(())
    }
}
