// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! rejected at load time instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level sqlshuttle configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShuttleConfig {
    /// How the database handle is opened.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Interrupt pacing for cancelled calls.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transaction behavior applied before data-modifying statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// `BEGIN DEFERRED` before the first write.
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE` before the first write.
    Immediate,
    /// `BEGIN EXCLUSIVE` before the first write.
    Exclusive,
    /// No implicit transactions; every statement commits on its own.
    Autocommit,
}

/// Connection-open options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Database file path, `:memory:`, or a `file:` URI when `uri` is set.
    #[serde(default = "default_location")]
    pub location: String,

    /// Interpret `location` as a `file:` URI.
    #[serde(default)]
    pub uri: bool,

    /// Create the database file if it does not exist.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,

    /// Open read-only.
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub isolation_level: IsolationLevel,

    /// How long a statement waits on a locked database, in milliseconds.
    /// `0` disables the busy handler.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            uri: false,
            create_if_missing: default_create_if_missing(),
            read_only: false,
            isolation_level: IsolationLevel::default(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_location() -> String {
    "sqlshuttle.db".to_string()
}

fn default_create_if_missing() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Interrupt pacing for calls whose caller was cancelled.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Pause between two interrupt signals, in milliseconds.
    #[serde(default = "default_interrupt_retry_interval_ms")]
    pub interrupt_retry_interval_ms: u64,

    /// Give up after this many interrupt signals. `0` keeps signalling
    /// until the call unwinds.
    #[serde(default)]
    pub max_interrupt_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interrupt_retry_interval_ms: default_interrupt_retry_interval_ms(),
            max_interrupt_retries: 0,
        }
    }
}

fn default_interrupt_retry_interval_ms() -> u64 {
    1
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
