// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for sqlshuttle connections.
//!
//! TOML files are looked up in the usual system/user/local hierarchy, merged
//! with `SQLSHUTTLE_*` environment variables and validated strictly
//! (`deny_unknown_fields`). Errors come back as miette diagnostics with
//! typo suggestions.
//!
//! ```no_run
//! use sqlshuttle_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.connection.location);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ConnectionConfig, DispatchConfig, IsolationLevel, LoggingConfig, ShuttleConfig};

/// Load configuration from the file hierarchy and environment, then validate it.
pub fn load_and_validate() -> Result<ShuttleConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &collect_toml_sources())),
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ShuttleConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![(diagnostic::INLINE_SOURCE.to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Contents of every config file that exists, keyed by the path figment reports.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_file_paths()
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            let path = if path.is_relative() {
                std::env::current_dir().map(|dir| dir.join(&path)).unwrap_or(path)
            } else {
                path
            };
            Some((path.display().to_string(), content))
        })
        .collect()
}
