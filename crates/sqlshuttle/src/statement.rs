// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leading-keyword classification for implicit transaction control.

/// What a statement's first keyword says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatementKind {
    /// `INSERT` or `REPLACE`.
    Insert,
    /// `UPDATE` or `DELETE`.
    Modify,
    Other,
}

impl StatementKind {
    pub(crate) fn classify(sql: &str) -> Self {
        let keyword = leading_keyword(sql);
        if keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace") {
            Self::Insert
        } else if keyword.eq_ignore_ascii_case("update") || keyword.eq_ignore_ascii_case("delete") {
            Self::Modify
        } else {
            Self::Other
        }
    }

    /// Data-modifying statements open an implicit transaction.
    pub(crate) fn is_dml(self) -> bool {
        matches!(self, Self::Insert | Self::Modify)
    }
}

/// First word of `sql` after whitespace and comments.
fn leading_keyword(sql: &str) -> &str {
    let rest = skip_trivia(sql);
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

fn skip_trivia(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |i| &rest[i + 1..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else {
            return sql;
        }
    }
}
