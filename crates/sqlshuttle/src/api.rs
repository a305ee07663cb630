// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operation traits for code generic over the connection type.
//!
//! [`Connection`] and [`Cursor`] implement these by delegating to their
//! inherent methods.

use async_trait::async_trait;

use crate::connection::Connection;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::value::{Column, Params, Row};

/// Async surface of a database handle.
#[async_trait]
pub trait AsyncConnection: Send + Sync {
    type Cursor: AsyncCursor;

    async fn cursor(&self) -> Result<Self::Cursor>;

    async fn execute(&self, sql: &str, params: Params) -> Result<Self::Cursor>;

    async fn execute_many(&self, sql: &str, seq: Vec<Params>) -> Result<Self::Cursor>;

    async fn execute_script(&self, script: &str) -> Result<Self::Cursor>;

    async fn commit(&self) -> Result<()>;

    /// Must run to completion even when the caller is cancelled.
    async fn rollback(&self) -> Result<()>;

    /// Must run to completion even when the caller is cancelled.
    async fn close(&self) -> Result<()>;
}

/// Async surface of a cursor.
#[async_trait]
pub trait AsyncCursor: Send + Sync + Sized {
    async fn execute(&self, sql: &str, params: Params) -> Result<Self>;

    async fn execute_many(&self, sql: &str, seq: Vec<Params>) -> Result<Self>;

    async fn execute_script(&self, script: &str) -> Result<Self>;

    async fn fetchone(&self) -> Result<Option<Row>>;

    async fn fetchmany(&self, size: Option<usize>) -> Result<Vec<Row>>;

    async fn fetchall(&self) -> Result<Vec<Row>>;

    async fn close(&self) -> Result<()>;

    fn description(&self) -> Option<Vec<Column>>;

    fn rowcount(&self) -> i64;

    fn lastrowid(&self) -> Option<i64>;

    fn arraysize(&self) -> usize;
}

#[async_trait]
impl AsyncConnection for Connection {
    type Cursor = Cursor;

    async fn cursor(&self) -> Result<Cursor> {
        Connection::cursor(self).await
    }

    async fn execute(&self, sql: &str, params: Params) -> Result<Cursor> {
        Connection::execute(self, sql, params).await
    }

    async fn execute_many(&self, sql: &str, seq: Vec<Params>) -> Result<Cursor> {
        Connection::execute_many(self, sql, seq).await
    }

    async fn execute_script(&self, script: &str) -> Result<Cursor> {
        Connection::execute_script(self, script).await
    }

    async fn commit(&self) -> Result<()> {
        Connection::commit(self).await
    }

    async fn rollback(&self) -> Result<()> {
        Connection::rollback(self).await
    }

    async fn close(&self) -> Result<()> {
        Connection::close(self).await
    }
}

#[async_trait]
impl AsyncCursor for Cursor {
    async fn execute(&self, sql: &str, params: Params) -> Result<Cursor> {
        Cursor::execute(self, sql, params).await
    }

    async fn execute_many(&self, sql: &str, seq: Vec<Params>) -> Result<Cursor> {
        Cursor::execute_many(self, sql, seq).await
    }

    async fn execute_script(&self, script: &str) -> Result<Cursor> {
        Cursor::execute_script(self, script).await
    }

    async fn fetchone(&self) -> Result<Option<Row>> {
        Cursor::fetchone(self).await
    }

    async fn fetchmany(&self, size: Option<usize>) -> Result<Vec<Row>> {
        Cursor::fetchmany(self, size).await
    }

    async fn fetchall(&self) -> Result<Vec<Row>> {
        Cursor::fetchall(self).await
    }

    async fn close(&self) -> Result<()> {
        Cursor::close(self).await
    }

    fn description(&self) -> Option<Vec<Column>> {
        Cursor::description(self)
    }

    fn rowcount(&self) -> i64 {
        Cursor::rowcount(self)
    }

    fn lastrowid(&self) -> Option<i64> {
        Cursor::lastrowid(self)
    }

    fn arraysize(&self) -> usize {
        Cursor::arraysize(self)
    }
}
