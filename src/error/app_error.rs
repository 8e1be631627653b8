use thiserror::Error;

use crate::config::error::ConfigError;
use crate::jobs::error::{JobError, StoreError};

/// Application-wide error type for the worker process and CLI commands.
///
/// Library modules keep their own error enums; this type joins them at the
/// command boundary so handlers can use `?` across modules.
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Queue or handler failure
    #[error(transparent)]
    Job(#[from] JobError),

    /// Backing store could not be reached
    #[error("Store unavailable")]
    Store {
        #[source]
        source: StoreError,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::ValidationError { field, message } => AppError::Validation {
                field,
                reason: message,
            },
            other => AppError::Configuration {
                key: "settings".to_string(),
                source: other.into(),
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        AppError::Store { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation_maps_to_validation() {
        let err: AppError = ConfigError::validation("queue.consumers", "must be positive").into();
        match err {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "queue.consumers");
                assert_eq!(reason, "must be positive");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_other_config_errors_keep_source() {
        let err: AppError = ConfigError::file_not_found("config/default.toml").into();
        assert!(matches!(err, AppError::Configuration { .. }));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("default.toml"));
    }

    #[test]
    fn test_job_error_is_transparent() {
        let err: AppError = JobError::NotRegistered("ghost".to_string()).into();
        assert_eq!(err.to_string(), "Job ghost is not registered");
    }

    #[test]
    fn test_store_error_conversion() {
        let err: AppError = StoreError::Connection("refused".to_string()).into();
        assert!(matches!(err, AppError::Store { .. }));
    }
}
