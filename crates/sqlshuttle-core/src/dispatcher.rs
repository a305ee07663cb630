// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatcher: one resource, one slot, one interrupt primitive.
//!
//! Guarded calls go through [`Dispatcher::run`]; cleanup calls go through
//! [`Dispatcher::run_shielded`] and [`Dispatcher::close`]. All of them
//! serialize on the same [`WorkerSlot`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{ClosedKind, DispatchError};
use crate::executor;
use crate::guard::{self, DropWatch, Inflight, InterruptPolicy};
use crate::outcome::Outcome;
use crate::shield;
use crate::slot::WorkerSlot;
use crate::traits::{DriverError, Interrupt};

/// What the blocking side of a guarded call ended with.
enum Job<T, E> {
    Closed,
    NotStarted,
    Finished(Result<T, E>),
}

/// Serializes cancellable calls against a single blocking resource.
///
/// Cloning is cheap and shares the slot, the interrupt primitive and the
/// closed flag.
pub struct Dispatcher<R, I> {
    slot: WorkerSlot<R>,
    interrupter: Arc<I>,
    policy: InterruptPolicy,
    closed: Arc<AtomicBool>,
}

impl<R, I> Clone for Dispatcher<R, I> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            interrupter: Arc::clone(&self.interrupter),
            policy: self.policy,
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<R, I> Dispatcher<R, I>
where
    R: Send + 'static,
    I: Interrupt,
{
    pub fn new(resource: R, interrupter: I, policy: InterruptPolicy) -> Self {
        Self {
            slot: WorkerSlot::new(resource),
            interrupter: Arc::new(interrupter),
            policy,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> InterruptPolicy {
        self.policy
    }

    /// Runs `op` through the interrupt guard.
    ///
    /// - fails fast with [`DispatchError::Closed`] after close, without
    ///   touching the worker;
    /// - returns [`Outcome::Cancelled`] without running `op` if `cx` is
    ///   cancelled before the call starts;
    /// - if `cx` is cancelled while `op` runs, interrupts the resource until
    ///   `op` returns. An "interrupted" driver error then becomes
    ///   [`Outcome::Cancelled`]; a success is still returned as a success.
    pub async fn run<T, E, F>(&self, cx: &CancellationToken, op: F) -> Outcome<T, E>
    where
        T: Send + 'static,
        E: DriverError,
        F: FnOnce(&mut R) -> Result<T, E> + Send + 'static,
    {
        if self.is_closed() {
            return Outcome::Err(DispatchError::Closed(ClosedKind::Database));
        }
        if cx.is_cancelled() {
            return Outcome::Cancelled;
        }

        let permit = tokio::select! {
            biased;
            _ = cx.cancelled() => return Outcome::Cancelled,
            permit = self.slot.acquire() => permit,
        };

        trace!("call dispatched to worker");
        let inflight = Inflight::new();
        let job_inflight = Arc::clone(&inflight);
        let job_cx = cx.clone();
        let mut task = executor::spawn_slotted(permit, move |permit| {
            let Some(resource) = permit.resource() else {
                return Job::Closed;
            };
            if !job_inflight.enter(&job_cx) {
                return Job::NotStarted;
            }
            let result = op(resource);
            job_inflight.finish();
            Job::Finished(result)
        });

        let mut watch = DropWatch::new(
            Arc::clone(&inflight),
            Arc::clone(&self.interrupter),
            self.policy,
        );
        let joined = tokio::select! {
            biased;
            joined = &mut task => joined,
            _ = cx.cancelled() => {
                let sent =
                    guard::interrupt_until_unwound(&inflight, &*self.interrupter, self.policy)
                        .await;
                trace!(interrupts = sent, "cancelled call handed back by the worker");
                (&mut task).await
            }
        };
        watch.disarm();

        match joined {
            Err(panic) => Outcome::Err(DispatchError::WorkerPanicked(panic.0)),
            Ok(Job::Closed) => Outcome::Err(DispatchError::Closed(ClosedKind::Database)),
            Ok(Job::NotStarted) => Outcome::Cancelled,
            Ok(Job::Finished(Ok(value))) => Outcome::Ok(value),
            Ok(Job::Finished(Err(err))) if err.is_interrupted() && cx.is_cancelled() => {
                debug!(error = %err, "interrupted call reported as cancellation");
                Outcome::Cancelled
            }
            Ok(Job::Finished(Err(err))) => Outcome::Err(DispatchError::Driver(err)),
        }
    }

    /// Runs `op` to completion, ignoring cancellation.
    pub async fn run_shielded<T, E, F>(&self, op: F) -> Result<T, DispatchError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce(&mut R) -> Result<T, E> + Send + 'static,
    {
        if self.is_closed() {
            return Err(DispatchError::Closed(ClosedKind::Database));
        }
        shield::run_shielded(&self.slot, move |permit| match permit.resource() {
            Some(resource) => op(resource).map_err(DispatchError::Driver),
            None => Err(DispatchError::Closed(ClosedKind::Database)),
        })
        .await
    }

    /// Marks the dispatcher closed and hands the resource to `op`, shielded.
    ///
    /// New calls fail synchronously from this point on. Closing twice is a
    /// no-op. If `op` hands the resource back with an error, it is restored
    /// and the dispatcher reopens.
    pub async fn close<E, F>(&self, op: F) -> Result<(), DispatchError<E>>
    where
        E: Send + 'static,
        F: FnOnce(R) -> Result<(), (R, E)> + Send + 'static,
    {
        self.closed.store(true, Ordering::Release);
        let result = shield::run_shielded(&self.slot, move |permit| {
            let Some(resource) = permit.take() else {
                return Ok(());
            };
            op(resource).map_err(|(resource, err)| {
                permit.restore(resource);
                DispatchError::Driver(err)
            })
        })
        .await;

        if matches!(result, Err(DispatchError::Driver(_))) {
            self.closed.store(false, Ordering::Release);
        }
        result
    }
}
