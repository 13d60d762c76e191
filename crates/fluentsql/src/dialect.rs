//! Clause-generation hooks for the supported SQL dialects.

use serde::{Deserialize, Serialize};

/// Target SQL dialect.
///
/// Only the clauses whose spelling differs between databases go through the
/// dialect; everything else is emitted as plain ANSI SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
}

/// Row lock hint appended after the rest of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lock {
    /// Exclusive row lock.
    ForUpdate,
    /// Shared row lock.
    Shared,
}

impl Dialect {
    /// Paging clause for `count` rows starting at `offset`.
    pub fn paging(self, offset: i64, count: i64) -> String {
        match self {
            Dialect::MySql => format!("LIMIT {offset},{count}"),
            Dialect::Postgres => format!("LIMIT {count} OFFSET {offset}"),
        }
    }

    pub fn lock(self, lock: Lock) -> &'static str {
        match (self, lock) {
            (_, Lock::ForUpdate) => "FOR UPDATE",
            (Dialect::MySql, Lock::Shared) => "LOCK IN SHARE MODE",
            (Dialect::Postgres, Lock::Shared) => "FOR SHARE",
        }
    }

    /// Wrap `inner` so the statement yields an integer truth value.
    pub fn exists(self, inner: &str) -> String {
        match self {
            Dialect::MySql => format!("SELECT EXISTS({inner})"),
            Dialect::Postgres => format!("SELECT CAST(EXISTS({inner}) AS INTEGER)"),
        }
    }

    /// Extend an INSERT so that it returns the generated key of the new row.
    pub fn insert_return_id(self, insert: &str, pk_column: &str) -> String {
        match self {
            Dialect::MySql => format!("{insert};SELECT @@IDENTITY;"),
            Dialect::Postgres => format!("{insert} RETURNING {pk_column}"),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::MySql => f.write_str("mysql"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_differs_by_dialect() {
        assert_eq!(Dialect::MySql.paging(10, 5), "LIMIT 10,5");
        assert_eq!(Dialect::Postgres.paging(10, 5), "LIMIT 5 OFFSET 10");
    }

    #[test]
    fn lock_hints() {
        assert_eq!(Dialect::MySql.lock(Lock::ForUpdate), "FOR UPDATE");
        assert_eq!(Dialect::Postgres.lock(Lock::ForUpdate), "FOR UPDATE");
        assert_eq!(Dialect::MySql.lock(Lock::Shared), "LOCK IN SHARE MODE");
        assert_eq!(Dialect::Postgres.lock(Lock::Shared), "FOR SHARE");
    }

    #[test]
    fn insert_return_id_suffix() {
        let insert = "INSERT INTO t (a) VALUES (@a)";
        assert_eq!(
            Dialect::MySql.insert_return_id(insert, "id"),
            "INSERT INTO t (a) VALUES (@a);SELECT @@IDENTITY;"
        );
        assert_eq!(
            Dialect::Postgres.insert_return_id(insert, "id"),
            "INSERT INTO t (a) VALUES (@a) RETURNING id"
        );
    }

    #[test]
    fn deserializes_lowercase_names() {
        let d: Dialect = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(d, Dialect::MySql);
        let l: Lock = serde_json::from_str("\"for_update\"").unwrap();
        assert_eq!(l, Lock::ForUpdate);
    }
}
