//! Configuration settings structures for courier
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::jobs::types::Payload;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

/// Environment variable holding a JSON array of cron entries
pub const CRON_ENTRIES_ENV: &str = "COURIER_CRON_ENTRIES";

/// Serializes tests that read or write `COURIER_CRON_ENTRIES`.
#[cfg(test)]
pub(crate) static CRON_ENTRIES_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "courier".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/courier.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_namespace() -> String {
    "jobs".to_string()
}

fn default_wait_seconds() -> u64 {
    5
}

fn default_consumers() -> usize {
    1
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    4
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_webhook_timeout() -> u64 {
    10
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format".to_string(), e.to_string()))?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format).map_err(
            |e| ConfigError::ValidationError {
                field: "logger.file".to_string(),
                message: e.to_string(),
            },
        )
    }
}

// ============================================================================
// Queue Configuration
// ============================================================================

/// Backing store for the queue lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-process lists; nothing survives a restart
    #[default]
    Memory,
    Redis,
}

/// Redis connection settings for the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size for non-blocking commands
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Store backend
    #[serde(default)]
    pub backend: QueueBackend,

    /// Key prefix for the main and dead-letter lists
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Blocking pop window in seconds
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,

    /// Number of consumer loops started by `work`
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// Redis settings, used when `backend = "redis"`
    #[serde(default)]
    pub redis: RedisQueueConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            namespace: default_namespace(),
            wait_seconds: default_wait_seconds(),
            consumers: default_consumers(),
            redis: RedisQueueConfig::default(),
        }
    }
}

// ============================================================================
// Jobs Configuration
// ============================================================================

/// One recurring schedule installed by the bootstrap job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronEntry {
    /// Label used in logs
    #[serde(default)]
    pub name: String,

    /// Cron expression, five or six fields
    #[serde(default)]
    pub spec: String,

    /// Registered job to enqueue on each firing
    #[serde(default)]
    pub job: String,

    /// Payload for every enqueued message
    #[serde(default)]
    pub payload: Payload,
}

/// Job scheduling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobsConfig {
    /// Schedules installed by `scheduler_bootstrap`
    #[serde(default)]
    pub cron_entries: Vec<CronEntry>,

    /// Whether `work` enqueues `scheduler_bootstrap` on startup
    #[serde(default)]
    pub bootstrap_on_start: bool,
}

impl JobsConfig {
    /// Cron entries after applying the `COURIER_CRON_ENTRIES` override.
    pub fn resolve_cron_entries(&self) -> Vec<CronEntry> {
        match std::env::var(CRON_ENTRIES_ENV) {
            Ok(raw) if !raw.trim().is_empty() => self.cron_entries_from_json(&raw),
            _ => self.cron_entries.clone(),
        }
    }

    fn cron_entries_from_json(&self, raw: &str) -> Vec<CronEntry> {
        match serde_json::from_str::<Vec<CronEntry>>(raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    env = CRON_ENTRIES_ENV,
                    error = %e,
                    "Invalid cron entries override, using configured entries"
                );
                self.cron_entries.clone()
            }
        }
    }
}

// ============================================================================
// Webhook Configuration
// ============================================================================

/// Outbound webhook delivery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_seconds: u64,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_webhook_timeout(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Queue and store configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Job scheduling configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Webhook transport configuration
    #[serde(default)]
    pub webhook: WebhookConfig,
}
