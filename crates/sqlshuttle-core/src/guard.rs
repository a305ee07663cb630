// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interrupt guard: turns caller cancellation into native interrupts.
//!
//! Each guarded call carries an [`Inflight`] token shared between the
//! blocking job and the cancellation watcher:
//!
//! ```text
//! Armed --enter()--> Running --finish()--> Completed
//!   |                   |
//!   | watcher           | watcher: interrupt, yield, repeat
//!   v                   v          while still Running
//! Abandoned          (Running until the job unwinds)
//! ```
//!
//! The resource may ignore an interrupt that lands before the call has
//! reached an interruptible point, so the watcher keeps signalling until the
//! job itself leaves `Running`.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::traits::Interrupt;

/// Lifecycle of one guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Dispatched, not yet started on the worker.
    Armed,
    /// The blocking call is executing; interrupts are needed to stop it.
    Running,
    /// The blocking call returned.
    Completed,
    /// Cancelled before the blocking call started; it never will.
    Abandoned,
}

/// How the watcher paces its interrupt signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptPolicy {
    /// Pause between two interrupt signals.
    pub interval: Duration,
    /// Stop signalling after this many interrupts; `0` means never give up.
    pub max_retries: u32,
}

impl Default for InterruptPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1),
            max_retries: 0,
        }
    }
}

impl InterruptPolicy {
    fn exhausted(&self, sent: u32) -> bool {
        self.max_retries != 0 && sent >= self.max_retries
    }
}

/// Per-call state shared by the blocking job and the watcher.
#[derive(Debug)]
pub struct Inflight {
    state: Mutex<GuardState>,
    cancel_requested: AtomicBool,
    interrupts: AtomicU32,
}

impl Inflight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(GuardState::Armed),
            cancel_requested: AtomicBool::new(false),
            interrupts: AtomicU32::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> GuardState {
        *self.lock()
    }

    /// Number of interrupt signals sent for this call.
    pub fn interrupts(&self) -> u32 {
        self.interrupts.load(Ordering::Acquire)
    }

    /// Whether a watcher started interrupting this call.
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Worker side: `Armed -> Running`.
    ///
    /// Returns `false` (and leaves the call `Abandoned`) when the caller was
    /// cancelled before the call could start.
    pub fn enter(&self, cx: &CancellationToken) -> bool {
        let mut state = self.lock();
        if *state == GuardState::Abandoned || cx.is_cancelled() {
            *state = GuardState::Abandoned;
            return false;
        }
        *state = GuardState::Running;
        true
    }

    /// Worker side: `Running -> Completed`.
    pub fn finish(&self) {
        *self.lock() = GuardState::Completed;
    }

    /// One watcher step. Returns `true` while the call still needs interrupting.
    fn signal<I: Interrupt + ?Sized>(&self, interrupter: &I) -> bool {
        let mut state = self.lock();
        match *state {
            GuardState::Armed => {
                *state = GuardState::Abandoned;
                false
            }
            GuardState::Running => {
                interrupter.interrupt();
                self.interrupts.fetch_add(1, Ordering::AcqRel);
                true
            }
            GuardState::Completed | GuardState::Abandoned => false,
        }
    }
}

/// Interrupts the call until it unwinds, yielding to the scheduler between signals.
///
/// Returns the number of interrupts sent.
pub async fn interrupt_until_unwound<I>(
    inflight: &Inflight,
    interrupter: &I,
    policy: InterruptPolicy,
) -> u32
where
    I: Interrupt + ?Sized,
{
    inflight.cancel_requested.store(true, Ordering::Release);
    let mut sent = 0;
    while inflight.signal(interrupter) {
        sent += 1;
        if policy.exhausted(sent) {
            warn!(sent, "blocking call still running after interrupt retries were exhausted");
            break;
        }
        tokio::time::sleep(policy.interval).await;
    }
    trace!(sent, state = ?inflight.state(), "interrupt watcher finished");
    sent
}

/// Same loop for contexts without a runtime (a guard dropped during shutdown).
pub fn interrupt_until_unwound_blocking<I>(
    inflight: &Inflight,
    interrupter: &I,
    policy: InterruptPolicy,
) -> u32
where
    I: Interrupt + ?Sized,
{
    inflight.cancel_requested.store(true, Ordering::Release);
    let mut sent = 0;
    while inflight.signal(interrupter) {
        sent += 1;
        if policy.exhausted(sent) {
            warn!(sent, "blocking call still running after interrupt retries were exhausted");
            break;
        }
        std::thread::sleep(policy.interval);
    }
    sent
}

/// Fires the interrupt loop if the awaiting future is dropped mid-call.
///
/// Dropping a future is how tokio cancels a task; without this guard the
/// blocking call would keep running unattended after `abort()` or a timeout.
pub(crate) struct DropWatch<I: Interrupt> {
    inflight: Arc<Inflight>,
    interrupter: Arc<I>,
    policy: InterruptPolicy,
    armed: bool,
}

impl<I: Interrupt> DropWatch<I> {
    pub(crate) fn new(
        inflight: Arc<Inflight>,
        interrupter: Arc<I>,
        policy: InterruptPolicy,
    ) -> Self {
        Self {
            inflight,
            interrupter,
            policy,
            armed: true,
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<I: Interrupt> Drop for DropWatch<I> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if matches!(
            self.inflight.state(),
            GuardState::Completed | GuardState::Abandoned
        ) {
            return;
        }
        let inflight = Arc::clone(&self.inflight);
        let interrupter = Arc::clone(&self.interrupter);
        let policy = self.policy;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    interrupt_until_unwound(&inflight, &*interrupter, policy).await;
                });
            }
            Err(_) => {
                interrupt_until_unwound_blocking(&inflight, &*interrupter, policy);
            }
        }
    }
}
