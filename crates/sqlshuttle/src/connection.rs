// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The async database handle.

use std::fmt;
use std::sync::Arc;

use sqlshuttle_config::ShuttleConfig;
use sqlshuttle_core::{ClosedKind, Dispatcher, executor};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info_span};

use crate::cursor::{Cursor, CursorLease};
use crate::error::{Error, Result};
use crate::options::OpenOptions;
use crate::scope::FailureHandler;
use crate::session::{Executed, Session, SqliteInterrupt};
use crate::value::Params;

pub(crate) type Shuttle = Dispatcher<Session, SqliteInterrupt>;

struct Inner {
    dispatcher: Shuttle,
    location: String,
    failure_handler: Option<FailureHandler>,
    span: Span,
}

/// An SQLite connection usable from async code.
///
/// Every call is shipped to tokio's blocking pool and serialized on one
/// worker slot, so the underlying `rusqlite::Connection` is never used from
/// two threads at once. Clones share the connection; each clone carries its
/// own cancellation token (see [`with_cancellation`](Self::with_cancellation)).
///
/// Cancelling the token, or dropping a pending call's future, interrupts the
/// running statement. [`close`](Self::close) and [`rollback`](Self::rollback)
/// are shielded from cancellation and always run to completion.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
    cx: CancellationToken,
}

/// Opens `location` with default options.
pub async fn connect(location: impl Into<String>) -> Result<Connection> {
    Connection::open(location, OpenOptions::default()).await
}

impl Connection {
    /// Opens a database on the blocking pool.
    pub async fn open(location: impl Into<String>, options: OpenOptions) -> Result<Self> {
        let location = location.into();
        let span = options
            .span
            .clone()
            .unwrap_or_else(|| info_span!("sqlite", location = %location));
        let cx = options.cancellation.clone().unwrap_or_default();
        if cx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut task = {
            let location = location.clone();
            let options = options.clone();
            executor::spawn(move || Session::open(&location, &options))
        };
        // A cancelled open detaches the task; the new connection is dropped
        // on the worker thread once it is ready.
        let opened = tokio::select! {
            biased;
            joined = &mut task => joined,
            _ = cx.cancelled() => return Err(Error::Cancelled),
        };
        let (session, interrupt) = opened
            .map_err(|panic| Error::WorkerPanicked(panic.0))?
            .inspect_err(|err| span.in_scope(|| debug!(error = %err, "open failed")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher::new(session, interrupt, options.interrupt_policy),
                location,
                failure_handler: options.failure_handler,
                span,
            }),
            cx,
        })
    }

    /// Opens the database described by a loaded configuration.
    pub async fn from_config(config: &ShuttleConfig) -> Result<Self> {
        let options = OpenOptions::from_config(&config.connection, &config.dispatch);
        Self::open(config.connection.location.clone(), options).await
    }

    /// A handle on the same connection whose calls observe `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cx: token,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cx
    }

    pub fn location(&self) -> &str {
        &self.inner.location
    }

    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    pub fn is_closed(&self) -> bool {
        self.inner.dispatcher.is_closed()
    }

    pub(crate) fn failure_handler(&self) -> Option<&FailureHandler> {
        self.inner.failure_handler.as_ref()
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed(ClosedKind::Database));
        }
        Ok(())
    }

    /// Runs `op` on the worker through the interrupt guard, observing `cx`.
    pub(crate) async fn dispatch<T, F>(&self, cx: &CancellationToken, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session) -> Result<T> + Send + 'static,
    {
        self.check_open()?;
        self.inner
            .dispatcher
            .run(cx, op)
            .instrument(self.inner.span.clone())
            .await
            .into_result()
    }

    /// Runs `op` on the worker to completion, ignoring cancellation.
    pub(crate) async fn dispatch_shielded<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session) -> Result<T> + Send + 'static,
    {
        self.check_open()?;
        self.inner
            .dispatcher
            .run_shielded(op)
            .instrument(self.inner.span.clone())
            .await
            .map_err(Error::from)
    }

    pub(crate) fn shuttle(&self) -> &Shuttle {
        &self.inner.dispatcher
    }

    /// Registers a cursor on the worker and runs `op` against it in the same job.
    ///
    /// The cursor is released again if `op` fails, or if nobody is left to
    /// claim it once the job returns.
    async fn open_cursor_with<F>(&self, op: F) -> Result<Cursor>
    where
        F: FnOnce(&mut Session, u64) -> Result<Executed> + Send + 'static,
    {
        let shuttle = self.shuttle().clone();
        let span = self.span().clone();
        let (lease, executed) = self
            .dispatch(&self.cx, move |session| {
                let mut lease = CursorLease::new(shuttle, span, session.open_cursor());
                match op(session, lease.id()) {
                    Ok(executed) => Ok((lease, executed)),
                    Err(err) => {
                        lease.disarm();
                        session.close_cursor(lease.id());
                        Err(err)
                    }
                }
            })
            .await?;
        Ok(Cursor::new(self.clone(), lease, executed))
    }

    /// Opens a new cursor.
    pub async fn cursor(&self) -> Result<Cursor> {
        self.open_cursor_with(|_, _| Ok(Executed::default())).await
    }

    /// Executes one statement on a fresh cursor and returns that cursor.
    ///
    /// Every result row is read on the worker before this returns; see
    /// [`Cursor::execute`].
    pub async fn execute(&self, sql: &str, params: Params) -> Result<Cursor> {
        let sql = sql.to_owned();
        self.open_cursor_with(move |session, id| session.execute(id, &sql, params))
            .await
    }

    /// Executes one DML statement per parameter set on a fresh cursor.
    pub async fn execute_many(&self, sql: &str, seq: Vec<Params>) -> Result<Cursor> {
        let sql = sql.to_owned();
        self.open_cursor_with(move |session, id| session.execute_many(id, &sql, seq))
            .await
    }

    /// Commits any pending transaction, then runs a multi-statement script.
    pub async fn execute_script(&self, script: &str) -> Result<Cursor> {
        let script = script.to_owned();
        self.open_cursor_with(move |session, id| session.execute_script(id, &script))
            .await
    }

    /// Commits the pending transaction, if any.
    ///
    /// A commit may wait on the disk or on a busy lock, so unlike
    /// [`rollback`](Self::rollback) it can be cancelled.
    pub async fn commit(&self) -> Result<()> {
        self.dispatch(&self.cx, Session::commit).await
    }

    /// Rolls back the pending transaction, if any. Shielded from cancellation.
    pub async fn rollback(&self) -> Result<()> {
        self.dispatch_shielded(Session::rollback).await
    }

    pub async fn in_transaction(&self) -> Result<bool> {
        self.dispatch(&self.cx, |session| Ok(session.in_transaction())).await
    }

    /// Closes the connection. Shielded from cancellation; closing twice is a no-op.
    ///
    /// Every later call on this handle, its clones and its cursors fails with
    /// [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        self.inner
            .dispatcher
            .close(Session::close)
            .instrument(self.inner.span.clone())
            .await
            .map_err(Error::from)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("location", &self.inner.location)
            .field("closed", &self.is_closed())
            .field("cancelled", &self.cx.is_cancelled())
            .finish()
    }
}
