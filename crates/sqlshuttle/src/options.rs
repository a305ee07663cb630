// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection-open options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::OpenFlags;
use sqlshuttle_config::{ConnectionConfig, DispatchConfig, IsolationLevel};
use sqlshuttle_core::InterruptPolicy;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::scope::{Failure, FailureHandler};

/// Builder for [`Connection::open`](crate::Connection::open).
#[derive(Clone)]
pub struct OpenOptions {
    pub(crate) create_if_missing: bool,
    pub(crate) uri: bool,
    pub(crate) read_only: bool,
    pub(crate) isolation_level: IsolationLevel,
    pub(crate) busy_timeout: Option<Duration>,
    pub(crate) interrupt_policy: InterruptPolicy,
    pub(crate) failure_handler: Option<FailureHandler>,
    pub(crate) span: Option<Span>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            uri: false,
            read_only: false,
            isolation_level: IsolationLevel::Deferred,
            busy_timeout: Some(Duration::from_millis(5000)),
            interrupt_policy: InterruptPolicy::default(),
            failure_handler: None,
            span: None,
            cancellation: None,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options matching a loaded `[connection]` and `[dispatch]` configuration.
    pub fn from_config(connection: &ConnectionConfig, dispatch: &DispatchConfig) -> Self {
        Self {
            create_if_missing: connection.create_if_missing,
            uri: connection.uri,
            read_only: connection.read_only,
            isolation_level: connection.isolation_level,
            busy_timeout: (connection.busy_timeout_ms > 0)
                .then(|| Duration::from_millis(connection.busy_timeout_ms)),
            interrupt_policy: InterruptPolicy {
                interval: Duration::from_millis(dispatch.interrupt_retry_interval_ms),
                max_retries: dispatch.max_interrupt_retries,
            },
            ..Self::default()
        }
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Treat the location as a `file:` URI.
    pub fn uri(mut self, uri: bool) -> Self {
        self.uri = uri;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    /// `None` disables SQLite's busy handler.
    pub fn busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Pause between interrupt signals sent to a cancelled call.
    pub fn interrupt_retry_interval(mut self, interval: Duration) -> Self {
        self.interrupt_policy.interval = interval;
        self
    }

    pub fn max_interrupt_retries(mut self, retries: u32) -> Self {
        self.interrupt_policy.max_retries = retries;
        self
    }

    /// Handler consulted when a [`scope`](crate::Connection::scope) body fails.
    pub fn failure_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Failure<'_>, &Span) -> bool + Send + Sync + 'static,
    {
        self.failure_handler = Some(Arc::new(handler));
        self
    }

    /// Span every operation on the handle is recorded under.
    ///
    /// Defaults to `info_span!("sqlite", location)`.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Cancellation token for the opened handle; a fresh one by default.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if self.create_if_missing {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        if self.uri {
            flags |= OpenFlags::SQLITE_OPEN_URI;
        }
        flags
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("create_if_missing", &self.create_if_missing)
            .field("uri", &self.uri)
            .field("read_only", &self.read_only)
            .field("isolation_level", &self.isolation_level)
            .field("busy_timeout", &self.busy_timeout)
            .field("interrupt_policy", &self.interrupt_policy)
            .field("failure_handler", &self.failure_handler.is_some())
            .finish_non_exhaustive()
    }
}
