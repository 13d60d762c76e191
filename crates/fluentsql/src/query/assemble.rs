//! Statement assembly: pure functions from accumulated fragments to SQL text.

use super::state::FragmentState;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::meta::{ColumnDescriptor, TableDescriptor};

fn push_clause(sql: &mut String, keyword: &str, clause: Option<String>) {
    if let Some(clause) = clause {
        sql.push(' ');
        sql.push_str(keyword);
        sql.push(' ');
        sql.push_str(&clause);
    }
}

fn insertable<'a>(
    table: &'a TableDescriptor,
    state: &'a FragmentState,
) -> impl Iterator<Item = &'a ColumnDescriptor> {
    table
        .columns
        .iter()
        .filter(|c| !c.identity && !state.is_excluded(c.name))
}

fn check_scoped(kind: &str, table: &TableDescriptor, state: &FragmentState) -> OrmResult<()> {
    if state.require_where && state.wheres.is_empty() {
        return Err(OrmError::validation(format!(
            "{kind} on `{}` has no WHERE clause and would affect every row",
            table.name
        )));
    }
    Ok(())
}

/// `INSERT INTO t (cols) VALUES (@props)` over every non-identity, non-excluded column.
pub(crate) fn insert(table: &TableDescriptor, state: &FragmentState) -> OrmResult<String> {
    let (names, values): (Vec<&str>, Vec<String>) = insertable(table, state)
        .map(|c| (c.name, format!("@{}", c.property)))
        .unzip();
    if names.is_empty() {
        return Err(OrmError::validation(format!(
            "no insertable columns left for `{}`",
            table.name
        )));
    }
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        names.join(", "),
        values.join(", ")
    ))
}

/// UPDATE in explicit mode when any SET was recorded, keyed whole-row otherwise.
pub(crate) fn update(table: &TableDescriptor, state: &FragmentState) -> OrmResult<String> {
    if !state.sets.is_empty() {
        check_scoped("UPDATE", table, state)?;
        let mut sql = format!("UPDATE {} SET {}", table.name, state.sets.join(", "));
        push_clause(&mut sql, "WHERE", state.where_clause());
        return Ok(sql);
    }

    let pk = table.primary_key()?;
    let assignments: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !c.primary_key && !state.is_excluded(c.name))
        .map(|c| format!("{} = @{}", c.name, c.property))
        .collect();
    if assignments.is_empty() {
        return Err(OrmError::validation(format!(
            "no updatable columns left for `{}`",
            table.name
        )));
    }
    Ok(format!(
        "UPDATE {} SET {} WHERE {} = @{}",
        table.name,
        assignments.join(", "),
        pk.name,
        pk.property
    ))
}

pub(crate) fn delete(table: &TableDescriptor, state: &FragmentState) -> OrmResult<String> {
    check_scoped("DELETE", table, state)?;
    let mut sql = format!("DELETE FROM {}", table.name);
    push_clause(&mut sql, "WHERE", state.where_clause());
    Ok(sql)
}

/// Every non-excluded column aliased to its property, in declaration order.
pub(crate) fn default_columns(table: &TableDescriptor, state: &FragmentState) -> OrmResult<String> {
    let columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !state.is_excluded(c.name))
        .map(|c| format!("{} AS {}", c.name, c.property))
        .collect();
    if columns.is_empty() {
        return Err(OrmError::validation(format!(
            "every column of `{}` is excluded",
            table.name
        )));
    }
    Ok(columns.join(", "))
}

pub(crate) fn select(
    table: &TableDescriptor,
    state: &FragmentState,
    dialect: Dialect,
) -> OrmResult<String> {
    let columns = match &state.columns {
        Some(columns) => columns.clone(),
        None => default_columns(table, state)?,
    };
    let mut sql = String::from("SELECT ");
    if state.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&columns);
    sql.push_str(" FROM ");
    sql.push_str(table.name);
    push_clause(&mut sql, "WHERE", state.where_clause());
    push_clause(&mut sql, "GROUP BY", state.group_clause());
    push_clause(&mut sql, "HAVING", state.having_clause());
    push_clause(&mut sql, "ORDER BY", state.order_clause());
    if let Some(paging) = state.paging {
        sql.push(' ');
        sql.push_str(&dialect.paging(paging.offset, paging.count));
    }
    if let Some(locks) = state.lock_clause(dialect) {
        sql.push(' ');
        sql.push_str(&locks);
    }
    Ok(sql)
}

/// Row count honouring WHERE/GROUP BY/HAVING; ORDER BY and paging never apply.
///
/// A grouped query is wrapped as a derived table so the result is the number
/// of groups rather than one count per group.
pub(crate) fn count(table: &TableDescriptor, state: &FragmentState) -> String {
    let grouped = !state.groups.is_empty();
    let mut sql = match &state.count_columns {
        Some(columns) if state.distinct => format!("SELECT COUNT(DISTINCT {columns})"),
        Some(columns) => format!("SELECT COUNT({columns})"),
        None if grouped => "SELECT 1 AS COUNT".to_string(),
        None => "SELECT COUNT(1)".to_string(),
    };
    sql.push_str(" FROM ");
    sql.push_str(table.name);
    push_clause(&mut sql, "WHERE", state.where_clause());
    push_clause(&mut sql, "GROUP BY", state.group_clause());
    push_clause(&mut sql, "HAVING", state.having_clause());
    if grouped {
        format!("SELECT COUNT(1) FROM ({sql}) AS T")
    } else {
        sql
    }
}

pub(crate) fn exists(table: &TableDescriptor, state: &FragmentState, dialect: Dialect) -> String {
    let mut inner = format!("SELECT 1 FROM {}", table.name);
    push_clause(&mut inner, "WHERE", state.where_clause());
    push_clause(&mut inner, "GROUP BY", state.group_clause());
    push_clause(&mut inner, "HAVING", state.having_clause());
    dialect.exists(&inner)
}

/// `SELECT SUM(expr) FROM t [WHERE ...]`; grouping and ordering are not applied.
pub(crate) fn sum(table: &TableDescriptor, state: &FragmentState) -> OrmResult<String> {
    let Some(expr) = &state.sum else {
        return Err(OrmError::validation("SUM requires a column or expression"));
    };
    let mut sql = format!("SELECT SUM({expr}) FROM {}", table.name);
    push_clause(&mut sql, "WHERE", state.where_clause());
    Ok(sql)
}

pub(crate) fn insert_return_id(
    table: &TableDescriptor,
    state: &FragmentState,
    dialect: Dialect,
) -> OrmResult<String> {
    let pk = table.primary_key()?;
    let insert = insert(table, state)?;
    Ok(dialect.insert_return_id(&insert, pk.name))
}
