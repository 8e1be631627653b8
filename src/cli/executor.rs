//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{DlqCommandHandler, EnqueueCommandHandler, WorkCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Execute a CLI command with the given settings
///
/// Running without a subcommand starts the worker.
///
/// # Errors
/// Returns errors from command handlers or validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    validate_command_args(cli, &settings)?;

    match &cli.command {
        Some(Commands::Work { dry_run, .. }) => {
            WorkCommandHandler::new(settings).execute(*dry_run).await
        }
        None => WorkCommandHandler::new(settings).execute(false).await,
        Some(Commands::Enqueue { job, payload }) => {
            EnqueueCommandHandler::new(settings)
                .execute(job, payload.clone())
                .await
                .map(|_| ())
        }
        Some(Commands::Dlq { limit }) => DlqCommandHandler::new(settings)
            .execute(*limit)
            .await
            .map(|_| ()),
    }
}

/// Validate command arguments before execution
///
/// Consumer count is not checked against `queue.redis.pool_size`: blocking
/// pops run on their own connections, outside the pool.
fn validate_command_args(cli: &Cli, _settings: &Settings) -> AppResult<()> {
    if let Err(msg) = cli.validate() {
        return Err(AppError::Validation {
            field: "cli_arguments".to_string(),
            reason: msg,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parser::Cli;
    use clap::Parser;

    #[tokio::test]
    async fn test_execute_work_dry_run() {
        let cli = Cli::try_parse_from(["courier", "work", "--dry-run"]).unwrap();

        let result = execute_command(&cli, Settings::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_execute_enqueue_unknown_job() {
        let cli = Cli::try_parse_from(["courier", "enqueue", "missing"]).unwrap();

        let result = execute_command(&cli, Settings::default()).await;
        assert!(matches!(result, Err(AppError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_execute_dlq() {
        let cli = Cli::try_parse_from(["courier", "dlq", "--limit", "5"]).unwrap();

        let result = execute_command(&cli, Settings::default()).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_command_args() {
        let cli = Cli::try_parse_from(["courier", "work", "--consumers", "8"]).unwrap();

        let result = validate_command_args(&cli, &Settings::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_redis_consumers_may_exceed_pool_size() {
        let cli = Cli::try_parse_from(["courier", "work", "--consumers", "64"]).unwrap();
        let mut settings = Settings::default();
        settings.queue.backend = crate::config::QueueBackend::Redis;
        settings.queue.redis.pool_size = 4;

        assert!(validate_command_args(&cli, &settings).is_ok());
    }

    #[test]
    fn test_validate_blank_enqueue_job() {
        let cli = Cli {
            command: Some(Commands::Enqueue {
                job: "   ".to_string(),
                payload: None,
            }),
            config: None,
            env: None,
            verbose: false,
            quiet: false,
        };

        let result = validate_command_args(&cli, &Settings::default());
        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "cli_arguments"
        ));
    }
}
