// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped use: commit on success, rollback on failure, pluggable handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use sqlshuttle::{Connection, Error, OpenOptions, Value, params};
use sqlshuttle_test_utils::TempDatabase;

const CREATE_LANG: &str = "CREATE TABLE lang(id INTEGER PRIMARY KEY, name VARCHAR UNIQUE)";

async fn shared(name: &str, options: OpenOptions) -> Connection {
    let uri = format!("file:{name}?mode=memory&cache=shared");
    Connection::open(uri, options.uri(true)).await.unwrap()
}

async fn languages(conn: &Connection) -> Vec<Vec<Value>> {
    conn.execute("SELECT name FROM lang", params![])
        .await
        .unwrap()
        .fetchall()
        .await
        .unwrap()
}

#[tokio::test]
async fn scope_commits_on_success() {
    let writer = shared("scope_commit", OpenOptions::new()).await;
    let cur = writer.cursor().await.unwrap();

    let inserted = writer
        .scope(|_| async {
            cur.execute(CREATE_LANG, params![]).await?;
            cur.execute("INSERT INTO lang(name) VALUES (?1)", params!["Rust"]).await?;
            Ok::<_, Error>(cur.lastrowid())
        })
        .await
        .unwrap();
    assert_eq!(inserted, Some(Some(1)));

    let reader = shared("scope_commit", OpenOptions::new()).await;
    assert_eq!(languages(&reader).await, vec![vec![Value::Text("Rust".into())]]);
}

#[tokio::test]
async fn scope_rolls_back_and_returns_the_error() {
    let writer = shared("scope_rollback", OpenOptions::new()).await;

    let err = writer
        .scope(|conn| async move {
            conn.execute(CREATE_LANG, params![]).await?;
            conn.execute("INSERT INTO lang(name) VALUES (?1)", params!["Rust"]).await?;
            Err::<(), _>(Error::Programming("foo".to_string()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Programming(ref msg) if msg == "foo"));
    assert!(!writer.in_transaction().await.unwrap());

    let reader = shared("scope_rollback", OpenOptions::new()).await;
    assert!(languages(&reader).await.is_empty());
}

#[tokio::test]
async fn scopes_on_one_file_are_seen_by_a_second_handle() {
    let db = TempDatabase::new().unwrap();
    let writer = sqlshuttle::connect(db.location()).await.unwrap();
    let reader = sqlshuttle::connect(db.location()).await.unwrap();

    writer
        .scope(|conn| async move {
            conn.execute(CREATE_LANG, params![]).await?;
            conn.execute("INSERT INTO lang(name) VALUES (?1)", params!["Rust"]).await?;
            Ok::<_, Error>(())
        })
        .await
        .unwrap();
    assert_eq!(languages(&reader).await, vec![vec![Value::Text("Rust".into())]]);

    let err = writer
        .scope(|conn| async move {
            conn.execute("INSERT INTO lang(name) VALUES (?1)", params!["Zig"]).await?;
            Err::<(), _>(Error::Programming("abandon".to_string()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Programming(_)));
    assert!(!writer.in_transaction().await.unwrap());
    assert_eq!(languages(&reader).await, vec![vec![Value::Text("Rust".into())]]);

    writer.close().await.unwrap();
    reader.close().await.unwrap();
}

#[tokio::test]
async fn handler_sees_the_failure_and_can_suppress_it() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let options = OpenOptions::new().failure_handler(move |failure, _span| {
        assert_eq!(failure.kind(), "DriverError");
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    let conn = shared("scope_handler", options).await;

    let result = conn
        .scope(|conn| async move {
            conn.execute(CREATE_LANG, params![]).await?;
            conn.execute("INSERT INTO lang(name) VALUES ('Rust')", params![]).await?;
            conn.execute("INSERT INTO lang(name) VALUES ('Rust')", params![]).await?;
            Ok::<_, Error>(())
        })
        .await
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(languages(&conn).await.is_empty());
}

#[tokio::test]
async fn successful_scopes_never_reach_the_handler() {
    let options = OpenOptions::new().failure_handler(|_, _| panic!("handler called on success"));
    let conn = shared("scope_quiet", options).await;
    let value = conn.scope(|_| async { Ok::<_, Error>(7) }).await.unwrap();
    assert_eq!(value, Some(7));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_scope_rolls_back_in_the_background() {
    let conn = shared("scope_dropped", OpenOptions::new()).await;
    conn.execute(CREATE_LANG, params![]).await.unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        conn.scope(|conn| async move {
            conn.execute("INSERT INTO lang(name) VALUES ('Rust')", params![]).await?;
            std::future::pending::<()>().await;
            Ok::<_, Error>(())
        }),
    )
    .await;
    assert!(abandoned.is_err());

    let deadline = Instant::now() + Duration::from_secs(10);
    while conn.in_transaction().await.unwrap() {
        assert!(Instant::now() < deadline, "abandoned scope was never rolled back");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(languages(&conn).await.is_empty());
}
