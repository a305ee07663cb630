// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capacity-1 worker slot owning the blocking resource.
//!
//! The resource lives inside the slot, so holding a [`SlotPermit`] is the only
//! way to reach it. Exclusivity is therefore structural: at most one blocking
//! call per resource can ever be in flight, and the permit is released the
//! moment the job that carries it finishes, whether or not anyone is still
//! awaiting the result.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Exclusive gate in front of one resource.
///
/// Cloning yields another handle to the same slot. Waiters are served in
/// FIFO order (tokio's mutex is fair).
pub struct WorkerSlot<R> {
    inner: Arc<Mutex<Option<R>>>,
}

impl<R> Clone for WorkerSlot<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Send + 'static> WorkerSlot<R> {
    pub fn new(resource: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(resource))),
        }
    }

    /// Waits for exclusive access to the resource.
    pub async fn acquire(&self) -> SlotPermit<R> {
        SlotPermit {
            guard: Arc::clone(&self.inner).lock_owned().await,
        }
    }

    /// Takes the slot only if nobody else holds it.
    pub fn try_acquire(&self) -> Option<SlotPermit<R>> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(|guard| SlotPermit { guard })
    }
}

/// Proof of exclusive access; movable into a blocking job.
pub struct SlotPermit<R> {
    guard: OwnedMutexGuard<Option<R>>,
}

impl<R> SlotPermit<R> {
    /// The resource, or `None` once it has been taken out by a close.
    pub fn resource(&mut self) -> Option<&mut R> {
        self.guard.as_mut()
    }

    /// Removes the resource from the slot; later permits see `None`.
    pub fn take(&mut self) -> Option<R> {
        self.guard.take()
    }

    /// Puts a resource back, e.g. after a close attempt failed.
    pub fn restore(&mut self, resource: R) {
        *self.guard = Some(resource);
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_none()
    }
}
