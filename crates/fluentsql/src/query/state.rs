//! Accumulated clause fragments of one query.

use crate::dialect::{Dialect, Lock};

/// LIMIT/OFFSET pair; both are always set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub offset: i64,
    pub count: i64,
}

/// A lock hint, rendered in the dialect in effect at assembly time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LockHint {
    Known(Lock),
    Raw(String),
}

/// Clause fragments collected by the fluent API and read by the assembler.
///
/// Every buffer is append-only; assembly never mutates it, so assembling the
/// same state twice yields identical SQL.
#[derive(Debug, Clone, Default)]
pub(crate) struct FragmentState {
    /// SQL names of columns left out of default projections, INSERT and UPDATE.
    pub excluded: Vec<String>,
    /// Explicit SELECT list, already aliased.
    pub columns: Option<String>,
    /// Explicit COUNT argument.
    pub count_columns: Option<String>,
    /// Argument of SUM.
    pub sum: Option<String>,
    /// `column = expr` assignments; non-empty means explicit UPDATE mode.
    pub sets: Vec<String>,
    pub wheres: Vec<String>,
    pub havings: Vec<String>,
    pub groups: Vec<String>,
    pub orders: Vec<String>,
    pub locks: Vec<LockHint>,
    pub distinct: bool,
    pub paging: Option<Paging>,
    /// Reject UPDATE/DELETE that would touch every row.
    pub require_where: bool,
}

impl FragmentState {
    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded.iter().any(|c| c == column)
    }

    pub fn where_clause(&self) -> Option<String> {
        join_nonempty(&self.wheres, " AND ")
    }

    pub fn having_clause(&self) -> Option<String> {
        join_nonempty(&self.havings, " AND ")
    }

    pub fn group_clause(&self) -> Option<String> {
        join_nonempty(&self.groups, ", ")
    }

    pub fn order_clause(&self) -> Option<String> {
        join_nonempty(&self.orders, ", ")
    }

    pub fn lock_clause(&self, dialect: Dialect) -> Option<String> {
        let hints: Vec<String> = self
            .locks
            .iter()
            .map(|hint| match hint {
                LockHint::Known(lock) => dialect.lock(*lock).to_string(),
                LockHint::Raw(sql) => sql.clone(),
            })
            .collect();
        join_nonempty(&hints, " ")
    }
}

fn join_nonempty(parts: &[String], sep: &str) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(sep))
    }
}
