// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A blocking resource that behaves like an embedded database handle.
//!
//! Like SQLite, a [`FakeResource`] forgets any interrupt that arrived before
//! a call started, so a single early signal is lost and the dispatcher has
//! to keep re-sending it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use sqlshuttle_core::{DriverError, Interrupt};
use thiserror::Error;

/// Errors raised by [`FakeResource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FakeError {
    #[error("interrupted")]
    Interrupted,
    #[error("fake failure: {0}")]
    Failed(String),
}

impl DriverError for FakeError {
    fn is_interrupted(&self) -> bool {
        matches!(self, FakeError::Interrupted)
    }
}

/// Tracks concurrent entries into a protected section.
#[derive(Debug, Default)]
pub struct EntryCounter {
    active: AtomicUsize,
    max_seen: AtomicUsize,
    total: AtomicUsize,
}

impl EntryCounter {
    pub fn enter(self: &Arc<Self>) -> EntryGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        EntryGuard {
            counter: Arc::clone(self),
        }
    }

    /// Highest number of simultaneous entries ever observed.
    pub fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// Leaves the protected section on drop.
pub struct EntryGuard {
    counter: Arc<EntryCounter>,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        self.counter.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Interrupt primitive for [`FakeResource`]; clones share the counters.
#[derive(Debug, Clone)]
pub struct FakeInterrupter {
    flag: Arc<AtomicBool>,
    signals: Arc<AtomicU32>,
}

impl FakeInterrupter {
    /// Number of interrupt signals received so far.
    pub fn signals(&self) -> u32 {
        self.signals.load(Ordering::SeqCst)
    }
}

impl Interrupt for FakeInterrupter {
    fn interrupt(&self) {
        self.signals.fetch_add(1, Ordering::SeqCst);
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Synchronous, single-threaded resource used to exercise the dispatcher.
#[derive(Debug)]
pub struct FakeResource {
    flag: Arc<AtomicBool>,
    entries: Arc<EntryCounter>,
    log: Vec<String>,
}

impl FakeResource {
    pub fn new() -> (Self, FakeInterrupter) {
        let flag = Arc::new(AtomicBool::new(false));
        let resource = Self {
            flag: Arc::clone(&flag),
            entries: Arc::new(EntryCounter::default()),
            log: Vec::new(),
        };
        let interrupter = FakeInterrupter {
            flag,
            signals: Arc::new(AtomicU32::new(0)),
        };
        (resource, interrupter)
    }

    /// Shared handle on the entry counter.
    pub fn entries(&self) -> Arc<EntryCounter> {
        Arc::clone(&self.entries)
    }

    /// Appends to the log after holding the protected section for `hold`.
    pub fn record(&mut self, entry: impl Into<String>, hold: Duration) -> Result<usize, FakeError> {
        let _inside = self.entries.enter();
        std::thread::sleep(hold);
        self.log.push(entry.into());
        Ok(self.log.len())
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Busy-works until interrupted or until `limit` elapses.
    ///
    /// Any interrupt sent before this call started is discarded.
    pub fn spin(&mut self, limit: Duration) -> Result<Duration, FakeError> {
        let _inside = self.entries.enter();
        self.flag.store(false, Ordering::SeqCst);
        let started = Instant::now();
        while started.elapsed() < limit {
            if self.flag.swap(false, Ordering::SeqCst) {
                return Err(FakeError::Interrupted);
            }
            std::thread::sleep(Duration::from_micros(200));
        }
        Ok(started.elapsed())
    }

    pub fn fail(&mut self, message: &str) -> Result<(), FakeError> {
        let _inside = self.entries.enter();
        Err(FakeError::Failed(message.to_string()))
    }
}
