// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Throwaway on-disk database locations.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temp directory plus a database file path inside it.
///
/// The directory (and every database in it) is removed on drop.
pub struct TempDatabase {
    dir: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> std::io::Result<Self> {
        Self::named("test.db")
    }

    pub fn named(file_name: &str) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name);
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The database path as a connection location string.
    pub fn location(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Another file path in the same directory.
    pub fn sibling(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }
}
