// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./sqlshuttle.toml` > `~/.config/sqlshuttle/sqlshuttle.toml`
//! > `/etc/sqlshuttle/sqlshuttle.toml`, with `SQLSHUTTLE_*` environment
//! variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ShuttleConfig;

/// File name looked up in each directory of the hierarchy.
pub const CONFIG_FILE_NAME: &str = "sqlshuttle.toml";

/// Configuration files in merge order (earliest is overridden by later ones).
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/sqlshuttle").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sqlshuttle").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// The full Figment: defaults, every config file, then env vars.
pub fn build_figment() -> Figment {
    let figment = config_file_paths()
        .into_iter()
        .fold(Figment::new().merge(Serialized::defaults(ShuttleConfig::default())), |fig, path| {
            fig.merge(Toml::file(path))
        });
    figment.merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<ShuttleConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ShuttleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShuttleConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShuttleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShuttleConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `SQLSHUTTLE_<SECTION>_<KEY>` -> `<section>.<key>`.
///
/// Mapped explicitly rather than split on `_`, since keys such as
/// `busy_timeout_ms` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("SQLSHUTTLE_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        ["connection", "dispatch", "logging"]
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key)
            .into()
    })
}
