// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the dispatch core and a concrete blocking resource.

use std::sync::Arc;

/// The resource's native "abort the in-flight call" primitive.
///
/// Implementations must be callable from any thread at any time, including
/// when no call is running; a signal that arrives early may be ignored by
/// the resource, which is why the guard keeps re-sending it.
pub trait Interrupt: Send + Sync + 'static {
    fn interrupt(&self);
}

impl<T: Interrupt + ?Sized> Interrupt for Arc<T> {
    fn interrupt(&self) {
        (**self).interrupt();
    }
}

/// Errors surfaced by a blocking resource.
pub trait DriverError: std::error::Error + Send + 'static {
    /// True when the error is the resource's generic "operation aborted"
    /// result, as produced by [`Interrupt::interrupt`].
    fn is_interrupted(&self) -> bool;
}
