// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async SQLite for tokio, one blocking worker per connection.
//!
//! `rusqlite` is synchronous and a connection must not be used from two
//! threads at once. sqlshuttle parks the connection in an exclusive worker
//! slot and runs every call on tokio's blocking pool, so async callers never
//! stall the scheduler. Cancelling a caller (through its
//! [`CancellationToken`](tokio_util::sync::CancellationToken) or by dropping
//! the call's future) interrupts the running statement; closing and rolling
//! back always run to completion.
//!
//! ```no_run
//! # async fn demo() -> sqlshuttle::Result<()> {
//! use sqlshuttle::params;
//!
//! let conn = sqlshuttle::connect("app.db").await?;
//! conn.execute("CREATE TABLE IF NOT EXISTS kv (k TEXT, v INTEGER)", params![]).await?;
//! conn.execute("INSERT INTO kv VALUES (?1, ?2)", params!["answer", 42]).await?;
//! conn.commit().await?;
//!
//! let rows = conn.execute("SELECT v FROM kv", params![]).await?.fetchall().await?;
//! assert_eq!(rows.len(), 1);
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod options;
pub mod scope;
mod session;
mod statement;
pub mod telemetry;
pub mod value;

pub use api::{AsyncConnection, AsyncCursor};
pub use connection::{Connection, connect};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use options::OpenOptions;
pub use scope::{Failure, FailureHandler, log_failure};
pub use sqlshuttle_config::IsolationLevel;
pub use sqlshuttle_core::ClosedKind;
pub use value::{Column, IntoValue, Params, Row, Value};
