//! Execution bridge: the session contract and its tokio-postgres implementation.

use crate::bind::{BoundSql, bind_named};
use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::meta::Entity;
use crate::param::Params;
use crate::query::Query;
use crate::row::{FromRow, RowExt};
use serde::Deserialize;
use std::time::Duration;
use tokio_postgres::types::FromSqlOwned;

/// Runs assembled SQL with its named parameters.
///
/// Implementations bind `@name` placeholders to their driver's syntax and
/// propagate driver failures unchanged; there are no retries.
pub trait Session: Send + Sync {
    /// Dialect new builders on this session assemble for.
    fn dialect(&self) -> Dialect;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &Params,
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Execute the same statement once per parameter set and sum the affected rows.
    fn execute_batch(
        &self,
        sql: &str,
        batch: &[Params],
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        async move {
            let mut affected = 0;
            for params in batch {
                affected += self.execute(sql, params, timeout).await?;
            }
            Ok(affected)
        }
    }

    /// First column of the first row; `None` for no rows or SQL NULL.
    fn scalar<T>(
        &self,
        sql: &str,
        params: &Params,
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = OrmResult<Option<T>>> + Send
    where
        T: FromSqlOwned + Send + 'static;

    /// All rows, mapped through [`FromRow`].
    fn query<T>(
        &self,
        sql: &str,
        params: &Params,
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = OrmResult<Vec<T>>> + Send
    where
        T: FromRow + Send;
}

/// Placeholder session type of build-only queries.
///
/// Builders created with [`Query::new`] hold no session; terminal operations
/// assemble their SQL and return empty results without touching this type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Session for Detached {
    fn dialect(&self) -> Dialect {
        Dialect::default()
    }

    async fn execute(&self, _sql: &str, _params: &Params, _timeout: Option<Duration>) -> OrmResult<u64> {
        Ok(0)
    }

    async fn scalar<T>(
        &self,
        _sql: &str,
        _params: &Params,
        _timeout: Option<Duration>,
    ) -> OrmResult<Option<T>>
    where
        T: FromSqlOwned + Send + 'static,
    {
        Ok(None)
    }

    async fn query<T>(
        &self,
        _sql: &str,
        _params: &Params,
        _timeout: Option<Duration>,
    ) -> OrmResult<Vec<T>>
    where
        T: FromRow + Send,
    {
        Ok(Vec::new())
    }
}

fn default_log_sql() -> bool {
    true
}

fn default_max_sql_length() -> Option<usize> {
    Some(200)
}

/// Settings of a [`PgSession`].
///
/// Deserializable so applications can load it from their own config files;
/// every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Timeout for statements that do not set their own. `None` means no timeout.
    pub command_timeout: Option<Duration>,
    /// Emit every statement as a `tracing` event on target `fluentsql.sql`.
    #[serde(default = "default_log_sql")]
    pub log_sql: bool,
    /// Truncate logged SQL to this many bytes. `None` means no truncation.
    #[serde(default = "default_max_sql_length")]
    pub max_sql_length: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout: None,
            log_sql: default_log_sql(),
            max_sql_length: default_max_sql_length(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default statement timeout.
    ///
    /// Statements exceeding it are cancelled server-side (best effort) and fail
    /// with [`OrmError::Timeout`].
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}

/// [`Session`] over a tokio-postgres client or transaction.
pub struct PgSession<C> {
    client: C,
    config: SessionConfig,
}

impl<C: GenericClient> PgSession<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, SessionConfig::default())
    }

    pub fn with_config(client: C, config: SessionConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Consume and return the inner client.
    pub fn into_inner(self) -> C {
        self.client
    }

    /// Start a query on entity `E` bound to this session.
    pub fn from<E: Entity>(&self) -> Query<'_, E, Self> {
        Query::on(self)
    }

    fn log(&self, kind: &'static str, bound: &BoundSql<'_>) {
        if !self.config.log_sql {
            return;
        }
        let sql = match self.config.max_sql_length {
            Some(max) if bound.sql.len() > max => {
                format!("{}...", truncate_sql_bytes(&bound.sql, max))
            }
            _ => bound.sql.clone(),
        };
        tracing::debug!(
            target: "fluentsql.sql",
            kind,
            param_count = bound.params.len(),
            sql = %sql,
        );
    }

    async fn with_timeout<T, F>(&self, future: F, timeout: Option<Duration>) -> OrmResult<T>
    where
        F: std::future::Future<Output = OrmResult<T>> + Send,
    {
        match timeout.or(self.config.command_timeout) {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = self.client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        Err(OrmError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        }
    }
}

impl<C: GenericClient> Session for PgSession<C> {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&self, sql: &str, params: &Params, timeout: Option<Duration>) -> OrmResult<u64> {
        let bound = bind_named(sql, params)?;
        self.log("execute", &bound);
        self.with_timeout(self.client.execute(&bound), timeout)
            .await
    }

    async fn scalar<T>(
        &self,
        sql: &str,
        params: &Params,
        timeout: Option<Duration>,
    ) -> OrmResult<Option<T>>
    where
        T: FromSqlOwned + Send + 'static,
    {
        let bound = bind_named(sql, params)?;
        self.log("scalar", &bound);
        let row = self
            .with_timeout(self.client.query_first(&bound), timeout)
            .await?;
        match row {
            Some(row) => row.try_get_index::<Option<T>>(0),
            None => Ok(None),
        }
    }

    async fn query<T>(
        &self,
        sql: &str,
        params: &Params,
        timeout: Option<Duration>,
    ) -> OrmResult<Vec<T>>
    where
        T: FromRow + Send,
    {
        let bound = bind_named(sql, params)?;
        self.log("query", &bound);
        let rows = self
            .with_timeout(self.client.query(&bound), timeout)
            .await?;
        rows.iter().map(T::from_row).collect()
    }
}

/// Cut `sql` to at most `max_bytes` without splitting a character.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_log_with_truncation() {
        let config = SessionConfig::default();
        assert_eq!(config.command_timeout, None);
        assert!(config.log_sql);
        assert_eq!(config.max_sql_length, Some(200));
    }

    #[test]
    fn config_deserializes_partial_documents() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"command_timeout": {"secs": 5, "nanos": 0}}"#).unwrap();
        assert_eq!(config.command_timeout, Some(Duration::from_secs(5)));
        assert!(config.log_sql);

        let config: SessionConfig =
            serde_json::from_str(r#"{"log_sql": false, "max_sql_length": null}"#).unwrap();
        assert!(!config.log_sql);
        assert_eq!(config.max_sql_length, None);
    }

    #[test]
    fn config_builder_setters() {
        let config = SessionConfig::new()
            .with_command_timeout(Duration::from_millis(250))
            .log_sql(false)
            .no_truncate();
        assert_eq!(config.command_timeout, Some(Duration::from_millis(250)));
        assert!(!config.log_sql);
        assert_eq!(config.max_sql_length, None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        // 'é' is two bytes; cutting inside it backs off to the boundary.
        assert_eq!(truncate_sql_bytes("é", 1), "");
    }
}
