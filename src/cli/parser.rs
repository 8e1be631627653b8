//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::jobs::types::Payload;

/// Background job worker backed by a Redis list queue
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Background job worker backed by a Redis list queue")]
#[command(long_about = "
Courier runs background jobs from a shared list queue. Messages that fail are
retried up to their job's limit and then parked in a dead-letter list for
inspection. Recurring jobs are installed from configured cron entries.

EXAMPLES:
    # Start a worker with default configuration
    courier work

    # Run four consumer loops in this process
    courier work --consumers 4

    # Use custom configuration file
    courier --config /path/to/config.toml work

    # Run in production mode with verbose logging
    courier --env production --verbose work

    # Check configuration without starting the worker
    courier work --dry-run

    # Enqueue a message for a registered job
    courier enqueue email_send --payload '{\"to\":\"ops@example.com\",\"subject\":\"hi\"}'

    # Show the 20 oldest dead-lettered messages
    courier dlq --limit 20

For more information about configuration options, see the documentation.
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Specify a custom configuration file to use instead of the layered
    /// configuration directory. The file must exist and be readable.
    ///
    /// Example: --config /etc/courier/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Increases log output to debug level. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Reduces log output to error level only. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the worker (default)
    ///
    /// Connects to the configured store, registers the built-in jobs, starts
    /// the cron engine and runs consumer loops until Ctrl+C or SIGTERM.
    ///
    /// Examples:
    ///   courier work                  # Start with defaults
    ///   courier work --consumers 8    # Eight consumer loops
    ///   courier work --dry-run        # Validate config without starting
    Work {
        /// Number of consumer loops
        ///
        /// Overrides `queue.consumers` from the configuration.
        /// Must be between 1 and 256.
        #[arg(long, value_name = "COUNT", value_parser = super::validation::validate_consumers)]
        consumers: Option<usize>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Enqueue a message for a registered job
    ///
    /// Examples:
    ///   courier enqueue scheduler_bootstrap
    ///   courier enqueue webhook_dispatch --payload '{"url":"https://example.com/hook"}'
    Enqueue {
        /// Registered job name
        #[arg(value_name = "JOB")]
        job: String,

        /// Message payload as a JSON object
        ///
        /// Default: {}
        #[arg(long, value_name = "JSON", value_parser = super::validation::validate_payload)]
        payload: Option<Payload>,
    },
    /// Show dead-lettered messages, oldest first
    ///
    /// Reading does not remove anything from the dead-letter list.
    Dlq {
        /// Maximum number of messages to show
        #[arg(short, long, value_name = "COUNT", default_value_t = 10)]
        limit: usize,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl Cli {
    /// Validate CLI arguments beyond what clap checks
    pub fn validate(&self) -> Result<(), String> {
        if let Some(Commands::Enqueue { job, .. }) = &self.command
            && job.trim().is_empty()
        {
            return Err("Job name cannot be empty".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        Ok(())
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
