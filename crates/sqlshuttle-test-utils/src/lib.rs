// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for sqlshuttle integration tests.
//!
//! # Components
//!
//! - [`FakeResource`] - instrumented blocking resource with a native-style interrupt
//! - [`EntryCounter`] - records how many calls were ever inside a protected section at once
//! - [`TempDatabase`] - temp directory holding an on-disk database path

pub mod fake_resource;
pub mod temp_db;

pub use fake_resource::{EntryCounter, EntryGuard, FakeError, FakeInterrupter, FakeResource};
pub use temp_db::TempDatabase;
