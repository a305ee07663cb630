// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The typed result of a guarded dispatch.

use crate::error::{Cancelled, DispatchError};

/// Result of running one call through the interrupt guard.
///
/// Cancellation gets its own arm instead of hiding inside the error type,
/// so callers can match on it without inspecting driver errors.
#[must_use]
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The call ran and returned a value.
    Ok(T),
    /// The caller was cancelled before or during the call.
    Cancelled,
    /// The call failed for a reason other than cancellation.
    Err(DispatchError<E>),
}

impl<T, E> Outcome<T, E> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Folds the outcome into a plain `Result` using the caller's error type.
    pub fn into_result<F>(self) -> Result<T, F>
    where
        F: From<Cancelled> + From<DispatchError<E>>,
    {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Cancelled => Err(F::from(Cancelled)),
            Self::Err(e) => Err(F::from(e)),
        }
    }
}

impl<T, E> From<Result<T, DispatchError<E>>> for Outcome<T, E> {
    fn from(result: Result<T, DispatchError<E>>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClosedKind;

    #[derive(Debug, PartialEq)]
    enum Folded {
        Cancelled,
        Closed,
        Panicked,
        Driver(&'static str),
    }

    impl From<Cancelled> for Folded {
        fn from(_: Cancelled) -> Self {
            Folded::Cancelled
        }
    }

    impl From<DispatchError<&'static str>> for Folded {
        fn from(e: DispatchError<&'static str>) -> Self {
            match e {
                DispatchError::Closed(_) => Folded::Closed,
                DispatchError::WorkerPanicked(_) => Folded::Panicked,
                DispatchError::Driver(d) => Folded::Driver(d),
            }
        }
    }

    #[test]
    fn into_result_keeps_each_arm_distinct() {
        let ok: Outcome<u8, &'static str> = Outcome::Ok(7);
        assert_eq!(ok.into_result::<Folded>(), Ok(7));

        let cancelled: Outcome<u8, &'static str> = Outcome::Cancelled;
        assert_eq!(cancelled.into_result::<Folded>(), Err(Folded::Cancelled));

        let closed: Outcome<u8, &'static str> =
            Outcome::Err(DispatchError::Closed(ClosedKind::Cursor));
        assert_eq!(closed.into_result::<Folded>(), Err(Folded::Closed));

        let driver: Outcome<u8, &'static str> = Outcome::Err(DispatchError::Driver("locked"));
        assert_eq!(driver.into_result::<Folded>(), Err(Folded::Driver("locked")));
    }
}
