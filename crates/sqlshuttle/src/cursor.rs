// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cursors: one result stream on a [`Connection`].
//!
//! The pending rows live with the connection on the worker; the cursor
//! itself only holds its id and a snapshot of the metadata published by the
//! last execute, so attribute reads never dispatch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use arc_swap::ArcSwap;
use sqlshuttle_core::{ClosedKind, DispatchError};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, trace, warn};

use crate::connection::{Connection, Shuttle};
use crate::error::{Error, Result};
use crate::session::{Executed, Session};
use crate::value::{Column, Params, Row};

/// Ownership of one cursor id in the worker's cursor table.
///
/// Created by the blocking job that registers the cursor and returned with
/// its result. Dropping an armed lease releases the worker-side rows, so a
/// cursor whose call was abandoned before the [`Cursor`] existed does not
/// linger until the connection closes.
pub(crate) struct CursorLease {
    shuttle: Shuttle,
    span: Span,
    id: u64,
    armed: bool,
}

impl CursorLease {
    pub(crate) fn new(shuttle: Shuttle, span: Span, id: u64) -> Self {
        Self {
            shuttle,
            span,
            id,
            armed: true,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The worker-side state is released some other way.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CursorLease {
    fn drop(&mut self) {
        if !self.armed || self.shuttle.is_closed() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let id = self.id;
        let shuttle = self.shuttle.clone();
        runtime.spawn(
            async move {
                let released = shuttle
                    .run_shielded(move |session| {
                        session.close_cursor(id);
                        Ok::<_, Error>(())
                    })
                    .await;
                match released {
                    Ok(()) => trace!(cursor = id, "unclaimed cursor released"),
                    Err(DispatchError::Closed(_)) => {}
                    Err(err) => warn!(cursor = id, error = %err, "failed to release cursor"),
                }
            }
            .instrument(self.span.clone()),
        );
    }
}

struct CursorInner {
    conn: Connection,
    lease: CursorLease,
    meta: ArcSwap<Executed>,
    closed: AtomicBool,
    arraysize: AtomicUsize,
}

/// A cursor on a [`Connection`]. Clones refer to the same cursor.
#[derive(Clone)]
pub struct Cursor {
    inner: Arc<CursorInner>,
    cx: CancellationToken,
}

impl Cursor {
    pub(crate) fn new(conn: Connection, lease: CursorLease, executed: Executed) -> Self {
        let cx = conn.cancellation().clone();
        Self {
            inner: Arc::new(CursorInner {
                conn,
                lease,
                meta: ArcSwap::from_pointee(executed),
                closed: AtomicBool::new(false),
                arraysize: AtomicUsize::new(1),
            }),
            cx,
        }
    }

    /// The same cursor, with calls observing `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cx: token,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.conn
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed(ClosedKind::Cursor));
        }
        self.inner.conn.check_open()
    }

    async fn run_execute<F>(&self, op: F) -> Result<Cursor>
    where
        F: FnOnce(&mut Session, u64) -> Result<Executed> + Send + 'static,
    {
        self.check_open()?;
        let id = self.inner.lease.id();
        let executed = self
            .inner
            .conn
            .dispatch(&self.cx, move |session| op(session, id))
            .await?;
        self.inner.meta.store(Arc::new(executed));
        Ok(self.clone())
    }

    /// Executes one statement; its rows become available to the fetch methods.
    ///
    /// The whole result set is read into memory on the worker before this
    /// returns, and the fetch methods drain that buffer. A large `SELECT`
    /// costs its full size in memory; narrow it with `LIMIT` or a `WHERE`
    /// clause and page through it instead.
    pub async fn execute(&self, sql: &str, params: Params) -> Result<Cursor> {
        let sql = sql.to_owned();
        self.run_execute(move |session, id| session.execute(id, &sql, params))
            .await
    }

    /// Executes one DML statement once per parameter set.
    pub async fn execute_many(&self, sql: &str, seq: Vec<Params>) -> Result<Cursor> {
        let sql = sql.to_owned();
        self.run_execute(move |session, id| session.execute_many(id, &sql, seq))
            .await
    }

    pub async fn execute_script(&self, script: &str) -> Result<Cursor> {
        let script = script.to_owned();
        self.run_execute(move |session, id| session.execute_script(id, &script))
            .await
    }

    async fn fetch(&self, limit: Option<usize>) -> Result<Vec<Row>> {
        self.check_open()?;
        let id = self.inner.lease.id();
        self.inner
            .conn
            .dispatch(&self.cx, move |session| session.fetch(id, limit))
            .await
    }

    /// Next row, or `None` once the result is exhausted.
    pub async fn fetchone(&self) -> Result<Option<Row>> {
        Ok(self.fetch(Some(1)).await?.into_iter().next())
    }

    /// Up to `size` rows; [`arraysize`](Self::arraysize) rows when `size` is `None`.
    pub async fn fetchmany(&self, size: impl Into<Option<usize>>) -> Result<Vec<Row>> {
        let size = size.into().unwrap_or_else(|| self.arraysize());
        self.fetch(Some(size)).await
    }

    /// Every remaining row.
    pub async fn fetchall(&self) -> Result<Vec<Row>> {
        self.fetch(None).await
    }

    /// Releases the cursor's pending rows. Shielded from cancellation;
    /// closing twice, or after the connection closed, is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) || self.inner.conn.is_closed() {
            return Ok(());
        }
        let id = self.inner.lease.id();
        self.inner
            .conn
            .dispatch_shielded(move |session| {
                session.close_cursor(id);
                Ok(())
            })
            .await
    }

    /// Column names of the last row-returning statement.
    pub fn description(&self) -> Option<Vec<Column>> {
        self.inner.meta.load().description.clone()
    }

    /// Rows modified by the last DML execute (summed over `execute_many`);
    /// `-1` for anything else.
    pub fn rowcount(&self) -> i64 {
        self.inner.meta.load().rowcount
    }

    /// Row id of the last row this cursor inserted.
    pub fn lastrowid(&self) -> Option<i64> {
        self.inner.meta.load().lastrowid
    }

    /// Default batch size for [`fetchmany`](Self::fetchmany).
    pub fn arraysize(&self) -> usize {
        self.inner.arraysize.load(Ordering::Relaxed)
    }

    pub fn set_arraysize(&self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::Programming("arraysize must be at least 1".to_string()));
        }
        self.inner.arraysize.store(size, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for CursorInner {
    fn drop(&mut self) {
        if *self.closed.get_mut() {
            self.lease.disarm();
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.inner.lease.id())
            .field("closed", &self.is_closed())
            .field("rowcount", &self.rowcount())
            .field("arraysize", &self.arraysize())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    async fn live_cursors(conn: &Connection) -> Vec<u64> {
        conn.dispatch(conn.cancellation(), |session| Ok(session.cursor_ids()))
            .await
            .unwrap()
    }

    async fn wait_until_released(conn: &Connection) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !live_cursors(conn).await.is_empty() {
            assert!(Instant::now() < deadline, "cursor state was never released");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropped_call_releases_its_unclaimed_cursor() {
        let conn = crate::connect(":memory:").await.unwrap();

        let mut call = Box::pin(conn.execute("SELECT 1 UNION ALL SELECT 2", vec![]));
        assert!(futures::poll!(call.as_mut()).is_pending());
        // Let the job finish with nobody left to build the cursor.
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(call);

        wait_until_released(&conn).await;
    }

    #[tokio::test]
    async fn held_cursors_stay_registered_until_closed_or_dropped() {
        let conn = crate::connect(":memory:").await.unwrap();
        let kept = conn.execute("SELECT 1", vec![]).await.unwrap();
        let closed = conn.cursor().await.unwrap();
        assert_eq!(live_cursors(&conn).await.len(), 2);

        closed.close().await.unwrap();
        assert_eq!(live_cursors(&conn).await.len(), 1);
        drop(closed);

        drop(kept);
        wait_until_released(&conn).await;
    }

    #[tokio::test]
    async fn failed_execute_leaves_no_cursor_behind() {
        let conn = crate::connect(":memory:").await.unwrap();
        assert!(conn.execute("SELEC 1", vec![]).await.is_err());
        assert!(live_cursors(&conn).await.is_empty());
    }
}
