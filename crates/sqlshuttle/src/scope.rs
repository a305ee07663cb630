// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped use of a connection: commit on success, roll back on failure.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, error, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};

/// A failed scope body, as handed to a failure handler.
#[derive(Debug, Clone, Copy)]
pub struct Failure<'a> {
    error: &'a Error,
}

impl<'a> Failure<'a> {
    pub fn new(error: &'a Error) -> Self {
        Self { error }
    }

    /// Short name of the error variant, such as `DriverError`.
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }

    pub fn error(&self) -> &'a Error {
        self.error
    }
}

/// Decides what happens to the error of a failed scope body.
///
/// Returning `true` marks the error handled: [`Connection::scope`] then
/// returns `Ok(None)` instead of the error.
pub type FailureHandler = Arc<dyn Fn(&Failure<'_>, &Span) -> bool + Send + Sync>;

/// Logs the failure as `SQLite exception` at error level and handles it.
pub fn log_failure(failure: &Failure<'_>, span: &Span) -> bool {
    span.in_scope(|| {
        error!(kind = failure.kind(), error = %failure.error(), "SQLite exception");
    });
    true
}

/// Rolls back if the scope future is dropped before it finished.
struct RollbackOnDrop {
    conn: Option<Connection>,
}

impl RollbackOnDrop {
    fn disarm(&mut self) {
        self.conn = None;
    }
}

impl Drop for RollbackOnDrop {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if conn.is_closed() {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(err) = conn.rollback().await {
                    conn.span().in_scope(|| {
                        warn!(error = %err, "rollback of an abandoned scope failed");
                    });
                }
            });
        }
    }
}

impl Connection {
    /// Runs `body` as one unit of work.
    ///
    /// - `Ok(value)`: the pending transaction is committed and
    ///   `Ok(Some(value))` returned. A failed commit is rolled back and its
    ///   error returned.
    /// - `Err(err)`: the pending transaction is rolled back, then the
    ///   connection's failure handler (if any) sees the error. If it returns
    ///   `true` the result is `Ok(None)`, otherwise `Err(err)`.
    ///
    /// Dropping the returned future before it finishes rolls back in the
    /// background.
    pub async fn scope<T, F, Fut>(&self, body: F) -> Result<Option<T>>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut guard = RollbackOnDrop {
            conn: Some(self.clone()),
        };
        let result = body(self.clone()).await;

        let outcome = match result {
            Ok(value) => match self.commit().await {
                Ok(()) => Ok(Some(value)),
                Err(err) => {
                    self.rollback_after_failure().await;
                    Err(err)
                }
            },
            Err(err) => {
                self.rollback_after_failure().await;
                let handled = self
                    .failure_handler()
                    .is_some_and(|handler| handler(&Failure::new(&err), self.span()));
                if handled { Ok(None) } else { Err(err) }
            }
        };
        guard.disarm();
        outcome
    }

    /// The original error wins over a failing rollback.
    async fn rollback_after_failure(&self) {
        if let Err(err) = self.rollback().await {
            self.span().in_scope(|| {
                warn!(error = %err, "rollback after a failed scope failed");
            });
        }
    }
}
