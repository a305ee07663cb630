// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-side state: the SQLite connection and its cursors' pending rows.
//!
//! A [`Session`] lives inside the dispatcher's worker slot and is only ever
//! touched from a blocking job holding the slot permit.

use std::collections::{HashMap, VecDeque};

use rusqlite::{InterruptHandle, params_from_iter};
use sqlshuttle_config::IsolationLevel;
use sqlshuttle_core::{ClosedKind, Interrupt};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::OpenOptions;
use crate::statement::StatementKind;
use crate::value::{Column, Params, Row, Value};

/// SQLite's interrupt primitive, shared with the dispatch watcher.
pub(crate) struct SqliteInterrupt(InterruptHandle);

impl Interrupt for SqliteInterrupt {
    fn interrupt(&self) {
        self.0.interrupt();
    }
}

/// What an execute call tells the cursor facade.
#[derive(Debug, Clone)]
pub(crate) struct Executed {
    pub(crate) description: Option<Vec<Column>>,
    pub(crate) rowcount: i64,
    pub(crate) lastrowid: Option<i64>,
}

impl Default for Executed {
    /// State of a cursor that has not executed anything yet.
    fn default() -> Self {
        Self {
            description: None,
            rowcount: -1,
            lastrowid: None,
        }
    }
}

#[derive(Debug, Default)]
struct CursorState {
    rows: VecDeque<Row>,
    lastrowid: Option<i64>,
}

pub(crate) struct Session {
    conn: rusqlite::Connection,
    isolation: IsolationLevel,
    cursors: HashMap<u64, CursorState>,
    next_cursor: u64,
}

impl Session {
    /// Opens the connection. Blocking: call from the worker pool.
    pub(crate) fn open(location: &str, options: &OpenOptions) -> Result<(Self, SqliteInterrupt)> {
        let conn = rusqlite::Connection::open_with_flags(location, options.open_flags())?;
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        let interrupt = SqliteInterrupt(conn.get_interrupt_handle());
        debug!(location, isolation = ?options.isolation_level, "database opened");
        let session = Self {
            conn,
            isolation: options.isolation_level,
            cursors: HashMap::new(),
            next_cursor: 0,
        };
        Ok((session, interrupt))
    }

    pub(crate) fn open_cursor(&mut self) -> u64 {
        self.next_cursor += 1;
        self.cursors.insert(self.next_cursor, CursorState::default());
        self.next_cursor
    }

    pub(crate) fn close_cursor(&mut self, id: u64) {
        self.cursors.remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn cursor_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.cursors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn cursor(&mut self, id: u64) -> Result<&mut CursorState> {
        self.cursors.get_mut(&id).ok_or(Error::Closed(ClosedKind::Cursor))
    }

    pub(crate) fn execute(&mut self, id: u64, sql: &str, params: Params) -> Result<Executed> {
        self.cursor(id)?.rows.clear();
        let kind = StatementKind::classify(sql);
        self.begin_implicit(kind)?;

        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let description = (column_count > 0).then(|| {
            stmt.column_names()
                .into_iter()
                .map(|name| Column { name: name.to_string() })
                .collect::<Vec<_>>()
        });

        let mut pending = VecDeque::new();
        if column_count > 0 {
            let mut rows = stmt.query(params_from_iter(params))?;
            while let Some(row) = rows.next()? {
                let values = (0..column_count)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Row>>()?;
                pending.push_back(values);
            }
        } else {
            stmt.execute(params_from_iter(params))?;
        }
        drop(stmt);

        let rowcount = if kind.is_dml() { self.changes() } else { -1 };
        let inserted = (kind == StatementKind::Insert).then(|| self.conn.last_insert_rowid());
        trace!(rows = pending.len(), rowcount, "statement executed");

        let cursor = self.cursor(id)?;
        cursor.rows = pending;
        if inserted.is_some() {
            cursor.lastrowid = inserted;
        }
        Ok(Executed {
            description,
            rowcount,
            lastrowid: cursor.lastrowid,
        })
    }

    pub(crate) fn execute_many(
        &mut self,
        id: u64,
        sql: &str,
        seq: Vec<Params>,
    ) -> Result<Executed> {
        self.cursor(id)?.rows.clear();
        let kind = StatementKind::classify(sql);
        if !kind.is_dml() {
            return Err(Error::Programming(
                "execute_many() can only execute DML statements".to_string(),
            ));
        }
        self.begin_implicit(kind)?;

        let mut stmt = self.conn.prepare(sql)?;
        let mut rowcount = 0_i64;
        for params in seq {
            rowcount += stmt.execute(params_from_iter(params))? as i64;
        }
        drop(stmt);

        Ok(Executed {
            description: None,
            rowcount,
            lastrowid: self.cursor(id)?.lastrowid,
        })
    }

    /// Commits any pending transaction, then runs `script` as-is.
    pub(crate) fn execute_script(&mut self, id: u64, script: &str) -> Result<Executed> {
        self.cursor(id)?.rows.clear();
        self.commit()?;
        self.conn.execute_batch(script)?;
        Ok(Executed {
            description: None,
            rowcount: -1,
            lastrowid: self.cursor(id)?.lastrowid,
        })
    }

    /// Pops up to `limit` pending rows; all of them when `limit` is `None`.
    pub(crate) fn fetch(&mut self, id: u64, limit: Option<usize>) -> Result<Vec<Row>> {
        let cursor = self.cursor(id)?;
        let n = limit.map_or(cursor.rows.len(), |l| l.min(cursor.rows.len()));
        Ok(cursor.rows.drain(..n).collect())
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
            debug!("transaction committed");
        }
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
            debug!("transaction rolled back");
        }
        Ok(())
    }

    pub(crate) fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Closes the connection, handing the session back if SQLite refuses.
    pub(crate) fn close(self) -> std::result::Result<(), (Self, Error)> {
        let Self {
            conn,
            isolation,
            next_cursor,
            ..
        } = self;
        match conn.close() {
            Ok(()) => {
                debug!("database closed");
                Ok(())
            }
            Err((conn, err)) => Err((
                Self {
                    conn,
                    isolation,
                    cursors: HashMap::new(),
                    next_cursor,
                },
                Error::Driver(err),
            )),
        }
    }

    fn begin_implicit(&self, kind: StatementKind) -> Result<()> {
        if !kind.is_dml() || !self.conn.is_autocommit() {
            return Ok(());
        }
        let begin = match self.isolation {
            IsolationLevel::Autocommit => return Ok(()),
            IsolationLevel::Deferred => "BEGIN DEFERRED",
            IsolationLevel::Immediate => "BEGIN IMMEDIATE",
            IsolationLevel::Exclusive => "BEGIN EXCLUSIVE",
        };
        trace!(begin, "implicit transaction");
        self.conn.execute_batch(begin)?;
        Ok(())
    }

    fn changes(&self) -> i64 {
        i64::try_from(self.conn.changes()).unwrap_or(i64::MAX)
    }
}
