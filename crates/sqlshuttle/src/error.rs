// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error type for every public sqlshuttle operation.

use rusqlite::ErrorCode;
use sqlshuttle_core::{Cancelled, ClosedKind, DispatchError, DriverError};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by [`Connection`](crate::Connection) and [`Cursor`](crate::Cursor).
#[derive(Debug, Error)]
pub enum Error {
    /// An error reported by SQLite, passed through unchanged.
    #[error(transparent)]
    Driver(#[from] rusqlite::Error),

    /// The caller's cancellation token fired before or during the call.
    #[error("operation cancelled")]
    Cancelled,

    #[error("cannot operate on a closed {0}")]
    Closed(ClosedKind),

    /// The API was used in a way SQLite cannot honor.
    #[error("programming error: {0}")]
    Programming(String),

    #[error("blocking worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short name of the error variant, as handed to failure handlers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Driver(_) => "DriverError",
            Self::Cancelled => "Cancelled",
            Self::Closed(_) => "ClosedResourceError",
            Self::Programming(_) => "ProgrammingError",
            Self::WorkerPanicked(_) => "WorkerPanicked",
            Self::Config(_) => "ConfigError",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The SQLite error code, for driver errors that carry one.
    pub fn sqlite_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Driver(err) => err.sqlite_error_code(),
            _ => None,
        }
    }
}

impl DriverError for Error {
    fn is_interrupted(&self) -> bool {
        self.sqlite_code() == Some(ErrorCode::OperationInterrupted)
    }
}

impl From<Cancelled> for Error {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<DispatchError<Error>> for Error {
    fn from(err: DispatchError<Error>) -> Self {
        match err {
            DispatchError::Closed(kind) => Self::Closed(kind),
            DispatchError::WorkerPanicked(msg) => Self::WorkerPanicked(msg),
            DispatchError::Driver(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interrupted() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            Some("interrupted".to_string()),
        )
    }

    #[test]
    fn interrupt_code_is_recognized() {
        assert!(Error::Driver(interrupted()).is_interrupted());
        assert!(!Error::Driver(rusqlite::Error::QueryReturnedNoRows).is_interrupted());
        assert!(!Error::Cancelled.is_interrupted());
    }

    #[test]
    fn dispatch_errors_fold_into_the_public_type() {
        let closed: Error = DispatchError::<Error>::Closed(ClosedKind::Cursor).into();
        assert_eq!(closed.to_string(), "cannot operate on a closed cursor");
        assert_eq!(closed.kind(), "ClosedResourceError");

        let driver: Error = DispatchError::Driver(Error::Driver(interrupted())).into();
        assert!(matches!(driver, Error::Driver(_)));
    }
}
