//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

use crate::jobs::types::Payload;

/// Upper bound on consumer loops per process
pub const MAX_CONSUMERS: usize = 256;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate consumer count is between 1 and `MAX_CONSUMERS`
pub fn validate_consumers(count_str: &str) -> Result<usize, String> {
    let count: usize = count_str.parse().map_err(|_| {
        format!(
            "Consumer count must be a valid positive number, got: '{}'",
            count_str
        )
    })?;

    if count == 0 {
        return Err("Consumer count must be greater than 0".to_string());
    }

    if count > MAX_CONSUMERS {
        return Err(format!("Consumer count cannot exceed {}", MAX_CONSUMERS));
    }

    Ok(count)
}

/// Parse a message payload; it must be a JSON object.
pub fn validate_payload(payload_str: &str) -> Result<Payload, String> {
    let value: serde_json::Value = serde_json::from_str(payload_str)
        .map_err(|e| format!("Payload must be valid JSON: {}", e))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!(
            "Payload must be a JSON object, got: {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
