// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs blocking jobs on tokio's blocking pool.
//!
//! The calling task is suspended while the job runs; the scheduler keeps
//! driving sibling tasks. A job that panics is reported as a
//! [`WorkerPanic`] instead of tearing down the caller.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::{JoinError, JoinHandle};

use crate::slot::SlotPermit;

/// A blocking job that did not return normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPanic(pub String);

/// Handle to a job running on the blocking pool.
///
/// Dropping it detaches the job; it keeps running (and keeps its slot
/// permit) until it returns.
#[must_use = "blocking tasks report their result through this handle"]
pub struct BlockingTask<T> {
    handle: JoinHandle<T>,
}

impl<T> Future for BlockingTask<T> {
    type Output = Result<T, WorkerPanic>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.map_err(worker_panic))
    }
}

/// Runs `job` outside the cooperative scheduler.
pub fn spawn<T, F>(job: F) -> BlockingTask<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    BlockingTask {
        handle: tokio::task::spawn_blocking(job),
    }
}

/// Runs `job` with exclusive access to the slot's resource.
///
/// The permit moves into the job and is released when the job returns.
pub fn spawn_slotted<R, T, F>(permit: SlotPermit<R>, job: F) -> BlockingTask<T>
where
    R: Send + 'static,
    F: FnOnce(&mut SlotPermit<R>) -> T + Send + 'static,
    T: Send + 'static,
{
    spawn(move || {
        let mut permit = permit;
        job(&mut permit)
    })
}

fn worker_panic(err: JoinError) -> WorkerPanic {
    if err.is_cancelled() {
        return WorkerPanic("blocking task cancelled by runtime shutdown".to_string());
    }
    WorkerPanic(panic_message(err.into_panic()))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
