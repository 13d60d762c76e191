//! Fluent query builder over one entity type.
//!
//! A [`Query`] accumulates clause fragments through chained calls and turns
//! them into SQL only when a terminal operation (`select`, `count`, `update`,
//! ...) runs. Builders are consumed by their terminal call, so one builder is
//! one query.
//!
//! ```ignore
//! use fluentsql::prelude::*;
//!
//! let session = PgSession::new(client);
//! let (page, total) = session
//!     .from::<User>()
//!     .and_where(User::AGE.ge(18))
//!     .when(only_active, |q| q.and_where(User::ACTIVE.eq(true)))
//!     .order_by_desc(User::CREATED_AT)
//!     .page(2, 20)
//!     .await?;
//! let users = page.select().await?;
//! ```
//!
//! Literal values are bound as `@name` parameters; nothing a caller passes as a
//! value is ever spliced into SQL text. The `*_raw` methods accept SQL text
//! verbatim and must only be given trusted input.

mod assemble;
mod exec;
mod state;


pub use state::Paging;

use crate::dialect::{Dialect, Lock};
use crate::error::{OrmError, OrmResult};
use crate::expr::{Column, Field, Predicate, Projection, SelectItem, render_field};
use crate::meta::{Entity, TableDescriptor};
use crate::param::{Param, Params};
use crate::session::{Detached, Session};
use state::{FragmentState, LockHint};
use std::marker::PhantomData;
use std::time::Duration;
use tokio_postgres::types::ToSql;

/// Query builder for entity `E`, optionally bound to session `S`.
pub struct Query<'s, E, S = Detached> {
    session: Option<&'s S>,
    state: FragmentState,
    params: Params,
    dialect: Dialect,
    timeout: Option<Duration>,
    /// First error raised while building; reported by assembly and terminals.
    error: Option<OrmError>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<'static, E, Detached> {
    /// A build-only query: terminals assemble SQL and return empty results.
    pub fn new() -> Self {
        Self::with_session(None, Dialect::default())
    }
}

impl<E: Entity> Default for Query<'static, E, Detached> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> std::fmt::Debug for Query<'_, E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("bound", &self.session.is_some())
            .field("state", &self.state)
            .field("params", &self.params)
            .field("dialect", &self.dialect)
            .field("timeout", &self.timeout)
            .field("error", &self.error)
            .finish()
    }
}

impl<'s, E: Entity, S: Session> Query<'s, E, S> {
    /// A query executed through `session`, in the session's dialect.
    pub fn on(session: &'s S) -> Self {
        Self::with_session(Some(session), session.dialect())
    }

    fn with_session(session: Option<&'s S>, dialect: Dialect) -> Self {
        Self {
            session,
            state: FragmentState::default(),
            params: Params::new(),
            dialect,
            timeout: None,
            error: None,
            _marker: PhantomData,
        }
    }

    fn table(&self) -> &'static TableDescriptor {
        E::table()
    }

    /// Run a fallible step; the first failure is kept and later steps are skipped.
    fn try_apply(mut self, step: impl FnOnce(&mut Self) -> OrmResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = step(&mut self) {
                self.error = Some(e);
            }
        }
        self
    }

    fn check(&self) -> OrmResult<()> {
        match &self.error {
            Some(e) => Err(e.replicate()),
            None => Ok(()),
        }
    }

    fn raw_fragment(sql: String, what: &str) -> OrmResult<String> {
        if sql.trim().is_empty() {
            return Err(OrmError::unsupported(format!("empty raw {what} fragment")));
        }
        Ok(sql)
    }

    fn projection(
        &mut self,
        projection: impl Projection<E>,
    ) -> OrmResult<Vec<SelectItem>> {
        let items = projection.build_columns(&mut self.params)?;
        if items.is_empty() {
            return Err(OrmError::unsupported("projection selects no columns"));
        }
        Ok(items)
    }

    // ==================== guards ====================

    /// Apply `f` only when `condition` holds; otherwise the builder is unchanged.
    pub fn when(self, condition: bool, f: impl FnOnce(Self) -> Self) -> Self {
        if condition { f(self) } else { self }
    }

    // ==================== WHERE ====================

    /// AND a predicate onto the WHERE clause.
    pub fn and_where(self, predicate: impl Predicate<E>) -> Self {
        self.try_apply(|q| {
            let sql = predicate.build_expression(&mut q.params)?;
            q.state.wheres.push(sql);
            Ok(())
        })
    }

    /// AND caller-written SQL onto the WHERE clause; `bind` adds the values
    /// its placeholders refer to. The fragment is parenthesised so an OR
    /// inside it stays local.
    pub fn and_where_raw(
        self,
        sql: impl Into<String>,
        bind: impl FnOnce(&mut Params) -> OrmResult<()>,
    ) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "WHERE")?;
            bind(&mut q.params)?;
            q.state.wheres.push(format!("({sql})"));
            Ok(())
        })
    }

    // ==================== ORDER BY / GROUP BY / HAVING ====================

    /// Sort ascending by each column of `projection`.
    pub fn order_by(self, projection: impl Projection<E>) -> Self {
        self.order(projection, "ASC")
    }

    /// Sort descending by each column of `projection`.
    pub fn order_by_desc(self, projection: impl Projection<E>) -> Self {
        self.order(projection, "DESC")
    }

    fn order(self, projection: impl Projection<E>, direction: &'static str) -> Self {
        self.try_apply(|q| {
            let items = q.projection(projection)?;
            q.state
                .orders
                .extend(items.into_iter().map(|i| format!("{} {direction}", i.sql)));
            Ok(())
        })
    }

    /// Append ORDER BY text verbatim, e.g. `"created_at DESC NULLS LAST"`.
    pub fn order_by_raw(self, sql: impl Into<String>) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "ORDER BY")?;
            q.state.orders.push(sql);
            Ok(())
        })
    }

    /// Group by each column of `projection`.
    pub fn group_by(self, projection: impl Projection<E>) -> Self {
        self.try_apply(|q| {
            let items = q.projection(projection)?;
            q.state.groups.extend(items.into_iter().map(|i| i.sql));
            Ok(())
        })
    }

    /// Append GROUP BY text verbatim.
    pub fn group_by_raw(self, sql: impl Into<String>) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "GROUP BY")?;
            q.state.groups.push(sql);
            Ok(())
        })
    }

    /// AND a predicate onto the HAVING clause.
    pub fn having(self, predicate: impl Predicate<E>) -> Self {
        self.try_apply(|q| {
            let sql = predicate.build_expression(&mut q.params)?;
            q.state.havings.push(sql);
            Ok(())
        })
    }

    /// AND caller-written SQL onto the HAVING clause, parenthesised like
    /// [`and_where_raw`](Query::and_where_raw).
    pub fn having_raw(
        self,
        sql: impl Into<String>,
        bind: impl FnOnce(&mut Params) -> OrmResult<()>,
    ) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "HAVING")?;
            bind(&mut q.params)?;
            q.state.havings.push(format!("({sql})"));
            Ok(())
        })
    }

    // ==================== projections ====================

    /// Leave columns out of the default SELECT list, INSERT and whole-row UPDATE.
    pub fn exclude(self, projection: impl Projection<E>) -> Self {
        self.try_apply(|q| {
            let items = q.projection(projection)?;
            q.state.excluded.extend(items.into_iter().map(|i| i.sql));
            Ok(())
        })
    }

    /// Replace the default SELECT list with `projection`, aliased by property.
    pub fn columns(self, projection: impl Projection<E>) -> Self {
        self.try_apply(|q| {
            let items = q.projection(projection)?;
            let list: Vec<String> = items.iter().map(SelectItem::aliased).collect();
            q.state.columns = Some(list.join(", "));
            Ok(())
        })
    }

    /// Replace the default SELECT list with SQL text.
    pub fn columns_raw(self, sql: impl Into<String>) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "column list")?;
            q.state.columns = Some(sql);
            Ok(())
        })
    }

    /// Emit `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.state.distinct = true;
        self
    }

    // ==================== SET ====================

    /// `column = @value`; switches UPDATE into explicit mode.
    pub fn set<V>(self, column: Column<E, V>, value: impl Into<V>) -> Self
    where
        V: ToSql + Send + Sync + 'static,
    {
        self.try_apply(|q| {
            let key = q.params.bind(column.property(), Param::new(value.into()));
            q.state.sets.push(format!("{} = @{key}", column.name()));
            Ok(())
        })
    }

    /// `column = <expression>`, e.g. `.set_expr(User::BALANCE, User::BALANCE + 10)`.
    pub fn set_expr<V>(self, column: Column<E, V>, value: impl Field<E, V>) -> Self {
        self.try_apply(|q| {
            let sql = render_field(value, &mut q.params);
            q.state.sets.push(format!("{} = {sql}", column.name()));
            Ok(())
        })
    }

    /// `column = <sql>` with caller-written SQL; `bind` adds its values.
    pub fn set_raw<V>(
        self,
        column: Column<E, V>,
        sql: impl Into<String>,
        bind: impl FnOnce(&mut Params) -> OrmResult<()>,
    ) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "SET")?;
            bind(&mut q.params)?;
            q.state.sets.push(format!("{} = {sql}", column.name()));
            Ok(())
        })
    }

    // ==================== paging / locking ====================

    /// Return `count` rows starting at zero-based row `offset`.
    ///
    /// A later call replaces the earlier window.
    pub fn skip(self, offset: i64, count: i64) -> Self {
        self.try_apply(|q| {
            if offset < 0 || count < 0 {
                return Err(OrmError::validation(format!(
                    "paging window must be non-negative (offset {offset}, count {count})"
                )));
            }
            q.state.paging = Some(state::Paging { offset, count });
            Ok(())
        })
    }

    /// Shorthand for `skip(0, count)`.
    pub fn take(self, count: i64) -> Self {
        self.skip(0, count)
    }

    pub(crate) fn set_page(self, index: i64, size: i64) -> Self {
        if index < 1 {
            return self.try_apply(|_| {
                Err(OrmError::validation(format!(
                    "page index is 1-based, got {index}"
                )))
            });
        }
        self.skip(size.saturating_mul(index - 1), size)
    }

    /// Append a row-lock hint rendered for the query's dialect.
    pub fn with_lock(mut self, lock: Lock) -> Self {
        self.state.locks.push(LockHint::Known(lock));
        self
    }

    /// Append lock-hint text verbatim.
    pub fn with_raw_lock(self, sql: impl Into<String>) -> Self {
        self.try_apply(|q| {
            let sql = Self::raw_fragment(sql.into(), "lock")?;
            q.state.locks.push(LockHint::Raw(sql));
            Ok(())
        })
    }

    // ==================== options ====================

    /// Timeout forwarded to the session for the terminal statement.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the dialect taken from the session.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Refuse to build UPDATE/DELETE statements without a WHERE clause.
    pub fn require_where(mut self) -> Self {
        self.state.require_where = true;
        self
    }

    // ==================== inspection ====================

    /// Parameters bound so far.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The current LIMIT/OFFSET window, if any.
    pub fn paging(&self) -> Option<Paging> {
        self.state.paging
    }

    // ==================== assembly ====================

    /// INSERT of every non-identity, non-excluded column.
    pub fn build_insert(&self) -> OrmResult<String> {
        self.check()?;
        assemble::insert(self.table(), &self.state)
    }

    /// UPDATE from the explicit SET list, or whole-row by primary key.
    pub fn build_update(&self) -> OrmResult<String> {
        self.check()?;
        assemble::update(self.table(), &self.state)
    }

    /// DELETE restricted by the WHERE fragments.
    pub fn build_delete(&self) -> OrmResult<String> {
        self.check()?;
        assemble::delete(self.table(), &self.state)
    }

    /// SELECT with every clause added so far.
    pub fn build_select(&self) -> OrmResult<String> {
        self.check()?;
        assemble::select(self.table(), &self.state, self.dialect)
    }

    /// Row count over WHERE, GROUP BY and HAVING; ORDER BY and paging are ignored.
    pub fn build_count(&self) -> OrmResult<String> {
        self.check()?;
        Ok(assemble::count(self.table(), &self.state))
    }

    /// `EXISTS` check over the filtering clauses, in the dialect's syntax.
    pub fn build_exists(&self) -> OrmResult<String> {
        self.check()?;
        Ok(assemble::exists(self.table(), &self.state, self.dialect))
    }

    /// SUM over `field`. The field's literals are bound into a copy of the
    /// parameters, so repeated calls render the same SQL.
    pub fn build_sum<V>(&self, field: impl Field<E, V>) -> OrmResult<String> {
        self.check()?;
        let mut params = self.params.clone();
        let mut state = self.state.clone();
        state.sum = Some(render_field(field, &mut params));
        assemble::sum(self.table(), &state)
    }

    /// INSERT returning the generated key in the dialect's syntax.
    pub fn build_insert_return_id(&self) -> OrmResult<String> {
        self.check()?;
        assemble::insert_return_id(self.table(), &self.state, self.dialect)
    }
}
