// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::ShuttleConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &ShuttleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let connection = &config.connection;

    if connection.location.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "connection.location must not be empty".to_string(),
        });
    }

    if connection.uri && !connection.location.starts_with("file:") {
        errors.push(ConfigError::Validation {
            message: format!(
                "connection.location `{}` must start with `file:` when connection.uri is true",
                connection.location
            ),
        });
    }

    if connection.read_only && connection.create_if_missing {
        errors.push(ConfigError::Validation {
            message: "connection.create_if_missing cannot be combined with connection.read_only"
                .to_string(),
        });
    }

    let interval = config.dispatch.interrupt_retry_interval_ms;
    if !(1..=1000).contains(&interval) {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.interrupt_retry_interval_ms must be between 1 and 1000, got {interval}"
            ),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
