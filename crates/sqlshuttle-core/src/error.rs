// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every dispatch primitive.

use std::fmt;

use thiserror::Error;

/// Which kind of resource was already closed when a call was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosedKind {
    /// The handle itself (the database connection).
    Database,
    /// A cursor opened on the handle.
    Cursor,
}

impl fmt::Display for ClosedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Cursor => f.write_str("cursor"),
        }
    }
}

/// Marker for a call whose caller was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Failures produced by dispatching a call, other than cancellation.
///
/// Cancellation is not an error here: it is a separate arm of
/// [`Outcome`](crate::Outcome).
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The handle or cursor was closed before the call was dispatched.
    #[error("cannot operate on a closed {0}")]
    Closed(ClosedKind),

    /// The blocking job panicked; carries the panic message.
    #[error("blocking worker panicked: {0}")]
    WorkerPanicked(String),

    /// The resource's own error, passed through unchanged.
    #[error(transparent)]
    Driver(E),
}
