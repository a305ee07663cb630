// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The async handle leaves the database exactly as plain rusqlite would,
//! and concurrent callers see a consistent connection.

use futures::future::join_all;
use proptest::prelude::*;
use sqlshuttle::{Connection, Value, params};

#[derive(Debug, Clone)]
enum Op {
    Insert(i64),
    Delete(i64),
    Update(i64, i64),
    Commit,
    Rollback,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..20_i64).prop_map(Op::Insert),
        2 => (0..20_i64).prop_map(Op::Delete),
        2 => (0..20_i64, 0..20_i64).prop_map(|(from, to)| Op::Update(from, to)),
        1 => Just(Op::Commit),
        1 => Just(Op::Rollback),
    ]
}

fn sql(op: &Op) -> Option<(&'static str, Vec<Value>)> {
    match *op {
        Op::Insert(v) => Some(("INSERT INTO t (v) VALUES (?1)", params![v])),
        Op::Delete(v) => Some(("DELETE FROM t WHERE v = ?1", params![v])),
        Op::Update(from, to) => Some(("UPDATE t SET v = ?2 WHERE v = ?1", params![from, to])),
        Op::Commit | Op::Rollback => None,
    }
}

/// Reference run with explicit transaction control on a plain connection.
fn reference(ops: &[Op]) -> (Vec<i64>, Vec<i64>) {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)").unwrap();

    let mut rowcounts = Vec::new();
    for op in ops {
        match op {
            Op::Commit if !conn.is_autocommit() => conn.execute_batch("COMMIT").unwrap(),
            Op::Rollback if !conn.is_autocommit() => conn.execute_batch("ROLLBACK").unwrap(),
            Op::Commit | Op::Rollback => {}
            dml => {
                if conn.is_autocommit() {
                    conn.execute_batch("BEGIN DEFERRED").unwrap();
                }
                let (sql, params) = sql(dml).unwrap();
                let changed = conn.execute(sql, rusqlite::params_from_iter(params)).unwrap();
                rowcounts.push(changed as i64);
            }
        }
    }
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT").unwrap();
    }

    let mut stmt = conn.prepare("SELECT v FROM t ORDER BY id").unwrap();
    let rows = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<i64>>>()
        .unwrap();
    (rows, rowcounts)
}

async fn shuttled(ops: &[Op]) -> (Vec<i64>, Vec<i64>) {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)", params![])
        .await
        .unwrap();

    let mut rowcounts = Vec::new();
    for op in ops {
        match op {
            Op::Commit => conn.commit().await.unwrap(),
            Op::Rollback => conn.rollback().await.unwrap(),
            dml => {
                let (sql, params) = sql(dml).unwrap();
                let cur = conn.execute(sql, params).await.unwrap();
                rowcounts.push(cur.rowcount());
                cur.close().await.unwrap();
            }
        }
    }
    conn.commit().await.unwrap();

    let rows = conn
        .execute("SELECT v FROM t ORDER BY id", params![])
        .await
        .unwrap()
        .fetchall()
        .await
        .unwrap()
        .into_iter()
        .map(|row| match row.as_slice() {
            [Value::Integer(v)] => *v,
            other => panic!("unexpected row {other:?}"),
        })
        .collect();
    conn.close().await.unwrap();
    (rows, rowcounts)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn same_state_as_plain_rusqlite(ops in prop::collection::vec(op(), 0..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let shuttled = runtime.block_on(shuttled(&ops));
        prop_assert_eq!(shuttled, reference(&ops));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_connection() {
    let conn = sqlshuttle::connect(":memory:").await.unwrap();
    conn.execute("CREATE TABLE t (v INTEGER)", params![]).await.unwrap();

    let writers = (0..16_i64).map(|i| {
        let conn: Connection = conn.clone();
        tokio::spawn(async move {
            for j in 0..10 {
                conn.execute("INSERT INTO t VALUES (?1)", params![i * 10 + j])
                    .await
                    .unwrap();
            }
        })
    });
    for joined in join_all(writers).await {
        joined.unwrap();
    }
    conn.commit().await.unwrap();

    let rows = conn
        .execute("SELECT count(*), sum(v) FROM t", params![])
        .await
        .unwrap()
        .fetchall()
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(160), Value::Integer((0..160).sum())]]);
}
