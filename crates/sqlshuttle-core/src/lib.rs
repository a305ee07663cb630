// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core dispatch machinery for sqlshuttle.
//!
//! A synchronous, single-threaded resource is parked inside a [`WorkerSlot`]
//! and every call against it is shipped to tokio's blocking pool. The
//! [`Dispatcher`] composes the pieces:
//!
//! - [`slot`]: capacity-1 exclusivity, owning the resource
//! - [`executor`]: runs jobs off the cooperative scheduler
//! - [`guard`]: turns task cancellation into native interrupts
//! - [`shield`]: cleanup calls that always run to completion
//!
//! Nothing here knows about SQL; the `sqlshuttle` crate plugs SQLite in.

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod guard;
pub mod outcome;
pub mod shield;
pub mod slot;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use error::{Cancelled, ClosedKind, DispatchError};
pub use guard::{GuardState, InterruptPolicy};
pub use outcome::Outcome;
pub use slot::{SlotPermit, WorkerSlot};
pub use traits::{DriverError, Interrupt};
