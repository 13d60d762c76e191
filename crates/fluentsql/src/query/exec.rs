//! Terminal operations: assemble, then hand the statement to the session.
//!
//! Every terminal assembles first, so building errors surface even on a
//! detached query. Without a session the assembled SQL is logged and the
//! neutral result (`vec![]`, `None`, `0`, `false`) is returned.

use super::Query;
use super::assemble;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Field, Projection, render_field};
use crate::meta::Entity;
use crate::param::Params;
use crate::row::FromRow;
use crate::session::Session;
use tokio_postgres::types::FromSqlOwned;

fn dry_run(sql: &str) {
    tracing::debug!(target: "fluentsql.query", sql = %sql, "no session bound, statement not executed");
}

impl<'s, E: Entity, S: Session> Query<'s, E, S> {
    fn take_error(&mut self) -> OrmResult<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn warn_unscoped(&self, kind: &str) {
        if self.state.wheres.is_empty() {
            tracing::warn!(
                target: "fluentsql.query",
                table = E::table().name,
                kind,
                "statement has no WHERE clause and affects every row"
            );
        }
    }

    /// Builder parameters plus the entity's own, which must not collide.
    fn entity_params(&self, entity: &E) -> OrmResult<Params> {
        let mut params = self.params.clone();
        params.merge(&entity.to_params()?)?;
        Ok(params)
    }

    async fn fetch<R: FromRow + Send>(mut self) -> OrmResult<Vec<R>> {
        self.take_error()?;
        let sql = assemble::select(E::table(), &self.state, self.dialect)?;
        match self.session {
            Some(session) => session.query(&sql, &self.params, self.timeout).await,
            None => {
                dry_run(&sql);
                Ok(Vec::new())
            }
        }
    }

    async fn scalar_of<T>(&self, sql: String) -> OrmResult<Option<T>>
    where
        T: FromSqlOwned + Send + 'static,
    {
        match self.session {
            Some(session) => session.scalar(&sql, &self.params, self.timeout).await,
            None => {
                dry_run(&sql);
                Ok(None)
            }
        }
    }

    async fn count_rows(&self) -> OrmResult<i64> {
        self.check()?;
        let sql = assemble::count(E::table(), &self.state);
        Ok(self.scalar_of::<i64>(sql).await?.unwrap_or(0))
    }

    // ==================== reads ====================

    /// All matching rows, selecting every non-excluded column.
    pub async fn select(self) -> OrmResult<Vec<E>>
    where
        E: FromRow,
    {
        self.fetch().await
    }

    /// All matching rows with a caller-written column list.
    pub async fn select_raw<R: FromRow + Send>(self, columns: &str) -> OrmResult<Vec<R>> {
        self.columns_raw(columns).fetch().await
    }

    /// All matching rows of `projection`, decoded as `R`.
    pub async fn select_as<R: FromRow + Send>(
        self,
        projection: impl Projection<E>,
    ) -> OrmResult<Vec<R>> {
        self.columns(projection).fetch().await
    }

    /// First matching row.
    pub async fn single(self) -> OrmResult<Option<E>>
    where
        E: FromRow,
    {
        Ok(self.take(1).fetch().await?.into_iter().next())
    }

    pub async fn single_raw<R: FromRow + Send>(self, columns: &str) -> OrmResult<Option<R>> {
        Ok(self
            .take(1)
            .columns_raw(columns)
            .fetch()
            .await?
            .into_iter()
            .next())
    }

    pub async fn single_as<R: FromRow + Send>(
        self,
        projection: impl Projection<E>,
    ) -> OrmResult<Option<R>> {
        Ok(self
            .take(1)
            .columns(projection)
            .fetch()
            .await?
            .into_iter()
            .next())
    }

    /// Number of matching rows, or of groups when grouped.
    pub async fn count(self) -> OrmResult<i64> {
        self.count_rows().await
    }

    /// `COUNT(<sql>)`, honouring `distinct()`.
    pub async fn count_raw(mut self, columns: &str) -> OrmResult<i64> {
        if columns.trim().is_empty() {
            return Err(OrmError::unsupported("empty raw COUNT fragment"));
        }
        self.state.count_columns = Some(columns.to_string());
        self.count_rows().await
    }

    /// `COUNT(<projection>)`, honouring `distinct()`.
    pub async fn count_by(mut self, projection: impl Projection<E>) -> OrmResult<i64> {
        self.take_error()?;
        let items = projection.build_columns(&mut self.params)?;
        if items.is_empty() {
            return Err(OrmError::unsupported("projection selects no columns"));
        }
        let columns: Vec<String> = items.into_iter().map(|i| i.sql).collect();
        self.state.count_columns = Some(columns.join(", "));
        self.count_rows().await
    }

    /// Whether any row matches; any positive result counts as true.
    pub async fn exists(mut self) -> OrmResult<bool> {
        self.take_error()?;
        let sql = assemble::exists(E::table(), &self.state, self.dialect);
        Ok(self.scalar_of::<i32>(sql).await?.is_some_and(|n| n > 0))
    }

    /// `SUM(field)` over matching rows; `None` when nothing matched.
    ///
    /// GROUP BY, HAVING and ORDER BY are not applied.
    pub async fn sum<R, V>(mut self, field: impl Field<E, V>) -> OrmResult<Option<R>>
    where
        R: FromSqlOwned + Send + 'static,
    {
        self.take_error()?;
        self.state.sum = Some(render_field(field, &mut self.params));
        let sql = assemble::sum(E::table(), &self.state)?;
        self.scalar_of(sql).await
    }

    /// Apply the window for 1-based page `index` of `size` rows and count every
    /// matching row.
    ///
    /// Always runs one COUNT query (when bound) before returning; the returned
    /// builder is then consumed by a read terminal.
    pub async fn page(self, index: i64, size: i64) -> OrmResult<(Self, i64)> {
        let query = self.set_page(index, size);
        let total = query.count_rows().await?;
        Ok((query, total))
    }

    /// [`page`](Query::page) when `condition` holds; otherwise the builder is
    /// returned unchanged with a total of 0.
    pub async fn page_if(self, condition: bool, index: i64, size: i64) -> OrmResult<(Self, i64)> {
        if condition {
            self.page(index, size).await
        } else {
            Ok((self, 0))
        }
    }

    // ==================== writes ====================

    async fn run(&self, sql: &str, params: &Params) -> OrmResult<u64> {
        match self.session {
            Some(session) => session.execute(sql, params, self.timeout).await,
            None => {
                dry_run(sql);
                Ok(0)
            }
        }
    }

    async fn run_batch(&self, sql: &str, batch: &[Params]) -> OrmResult<u64> {
        match self.session {
            Some(session) => session.execute_batch(sql, batch, self.timeout).await,
            None => {
                dry_run(sql);
                Ok(0)
            }
        }
    }

    /// Insert `entity`, skipping identity and excluded columns.
    pub async fn insert(mut self, entity: &E) -> OrmResult<u64> {
        self.take_error()?;
        let sql = assemble::insert(E::table(), &self.state)?;
        let params = self.entity_params(entity)?;
        self.run(&sql, &params).await
    }

    /// Insert every entity with one statement execution each.
    pub async fn insert_many(mut self, entities: &[E]) -> OrmResult<u64> {
        self.take_error()?;
        let sql = assemble::insert(E::table(), &self.state)?;
        let batch = entities
            .iter()
            .map(|e| self.entity_params(e))
            .collect::<OrmResult<Vec<_>>>()?;
        self.run_batch(&sql, &batch).await
    }

    /// Insert `entity` and return the key the database generated for it.
    pub async fn insert_return_id<R>(mut self, entity: &E) -> OrmResult<Option<R>>
    where
        R: FromSqlOwned + Send + 'static,
    {
        self.take_error()?;
        let sql = assemble::insert_return_id(E::table(), &self.state, self.dialect)?;
        let params = self.entity_params(entity)?;
        match self.session {
            Some(session) => session.scalar(&sql, &params, self.timeout).await,
            None => {
                dry_run(&sql);
                Ok(None)
            }
        }
    }

    /// Run the explicit UPDATE built from `set` calls.
    ///
    /// Without any `set` call there are no values to write; use
    /// [`update_entity`](Query::update_entity) for whole-row updates.
    pub async fn update(mut self) -> OrmResult<u64> {
        self.take_error()?;
        if self.state.sets.is_empty() {
            return Err(OrmError::validation(
                "update() needs at least one set(); use update_entity() to write a whole row",
            ));
        }
        let sql = assemble::update(E::table(), &self.state)?;
        self.warn_unscoped("UPDATE");
        self.run(&sql, &self.params).await
    }

    /// UPDATE with `entity`'s fields bound as parameters.
    ///
    /// Without `set` calls every non-key, non-excluded column is written and
    /// the row is matched by primary key; otherwise the explicit SET list and
    /// WHERE clause are used.
    pub async fn update_entity(mut self, entity: &E) -> OrmResult<u64> {
        self.take_error()?;
        let sql = assemble::update(E::table(), &self.state)?;
        if !self.state.sets.is_empty() {
            self.warn_unscoped("UPDATE");
        }
        let params = self.entity_params(entity)?;
        self.run(&sql, &params).await
    }

    /// [`update_entity`](Query::update_entity) for each entity; affected rows are summed.
    pub async fn update_many(mut self, entities: &[E]) -> OrmResult<u64> {
        self.take_error()?;
        let sql = assemble::update(E::table(), &self.state)?;
        if !self.state.sets.is_empty() {
            self.warn_unscoped("UPDATE");
        }
        let batch = entities
            .iter()
            .map(|e| self.entity_params(e))
            .collect::<OrmResult<Vec<_>>>()?;
        self.run_batch(&sql, &batch).await
    }

    /// DELETE matching rows; with no WHERE clause this empties the table
    /// unless [`require_where`](Query::require_where) was set.
    pub async fn delete(mut self) -> OrmResult<u64> {
        self.take_error()?;
        let sql = assemble::delete(E::table(), &self.state)?;
        self.warn_unscoped("DELETE");
        self.run(&sql, &self.params).await
    }
}
