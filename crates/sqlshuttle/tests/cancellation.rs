// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancelling callers interrupts SQLite; cleanup still runs.

use std::time::{Duration, Instant};

use sqlshuttle::{Connection, Error, OpenOptions, Value, params};
use sqlshuttle_test_utils::TempDatabase;
use tokio_util::sync::CancellationToken;

/// Never finishes on its own; only an interrupt stops it.
const ENDLESS_SCAN: &str =
    "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c";

const DEADLINE: Duration = Duration::from_secs(10);

async fn select_one(conn: &Connection) -> Vec<Vec<Value>> {
    conn.execute("SELECT 1", params![])
        .await
        .unwrap()
        .fetchall()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_cancellation_interrupts_a_running_query() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    let token = CancellationToken::new();
    let scoped = conn.with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = tokio::time::timeout(DEADLINE, scoped.execute(ENDLESS_SCAN, params![]))
        .await
        .expect("interrupt should stop the scan")
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, Error::Cancelled), "got {err:?}");
    assert!(started.elapsed() < DEADLINE);

    // The original handle, with its own token, is unaffected.
    assert_eq!(select_one(&conn).await, vec![vec![Value::Integer(1)]]);
}

#[tokio::test]
async fn already_cancelled_token_never_dispatches() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let scoped = conn.with_cancellation(token);

    assert!(matches!(scoped.cursor().await, Err(Error::Cancelled)));
    assert!(matches!(scoped.commit().await, Err(Error::Cancelled)));
    assert!(!conn.in_transaction().await.unwrap());
}

#[tokio::test]
async fn cancelled_open_reports_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let err = Connection::open(":memory:", OpenOptions::new().cancellation(token))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aborting_the_task_frees_the_worker() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();

    let runner = conn.clone();
    let task = tokio::spawn(async move { runner.execute(ENDLESS_SCAN, params![]).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let next = tokio::time::timeout(DEADLINE, select_one(&conn))
        .await
        .expect("the aborted scan should have been interrupted");
    assert_eq!(next, vec![vec![Value::Integer(1)]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_interrupts_the_call_it_dropped() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    let cur = conn.cursor().await.unwrap();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), cur.execute(ENDLESS_SCAN, params![]))
            .await;
    assert!(timed_out.is_err());

    let next = tokio::time::timeout(DEADLINE, select_one(&conn))
        .await
        .expect("the dropped scan should have been interrupted");
    assert_eq!(next, vec![vec![Value::Integer(1)]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_caller_does_not_block_others_waiting_on_the_slot() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    let token = CancellationToken::new();

    let runner = conn.with_cancellation(token.clone());
    let scan = tokio::spawn(async move { runner.execute(ENDLESS_SCAN, params![]).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let waiter = conn.clone();
    let queued = tokio::spawn(async move { select_one(&waiter).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    assert!(matches!(scan.await.unwrap(), Err(Error::Cancelled)));
    let rows = tokio::time::timeout(DEADLINE, queued).await.unwrap().unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(1)]]);
}

// ---- Shielded cleanup ----

#[tokio::test]
async fn rollback_and_close_ignore_a_cancelled_token() {
    let db = TempDatabase::new().unwrap();
    let conn = sqlshuttle::connect(db.location()).await.unwrap();
    conn.execute("CREATE TABLE t (v)", params![]).await.unwrap();
    conn.execute("INSERT INTO t VALUES (1)", params![]).await.unwrap();
    let cur = conn.cursor().await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = conn.with_cancellation(token.clone());

    cancelled.rollback().await.unwrap();
    cur.with_cancellation(token).close().await.unwrap();
    assert!(matches!(cancelled.commit().await, Err(Error::Cancelled)));
    cancelled.close().await.unwrap();
    assert!(conn.is_closed());

    std::fs::rename(db.path(), db.sibling("moved.db")).unwrap();
    let reopened = sqlshuttle::connect(db.sibling("moved.db").to_string_lossy())
        .await
        .unwrap();
    let rows = reopened
        .execute("SELECT count(*) FROM t", params![])
        .await
        .unwrap()
        .fetchall()
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(0)]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_rollback_still_rolls_back() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    conn.execute("CREATE TABLE t (v)", params![]).await.unwrap();
    conn.execute("INSERT INTO t VALUES (1)", params![]).await.unwrap();
    assert!(conn.in_transaction().await.unwrap());

    // Polled once, then dropped.
    let _ = tokio::time::timeout(Duration::ZERO, conn.rollback()).await;

    let deadline = Instant::now() + DEADLINE;
    while conn.in_transaction().await.unwrap() {
        assert!(Instant::now() < deadline, "rollback never completed");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let rows = conn
        .execute("SELECT count(*) FROM t", params![])
        .await
        .unwrap()
        .fetchall()
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(0)]]);
}
