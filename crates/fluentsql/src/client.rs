//! Driver seam: anything that can run a bound statement.

use crate::bind::BoundSql;
use crate::error::{OrmError, OrmResult};
use tokio_postgres::{CancelToken, Row};

/// A tokio-postgres connection or transaction.
///
/// [`PgSession`](crate::PgSession) is generic over this trait, so the same
/// query code runs against a plain connection or inside a transaction.
/// Driver errors are classified through [`OrmError::from_db_error`].
pub trait GenericClient: Send + Sync {
    /// Run a statement and return all rows.
    fn query(&self, stmt: &BoundSql<'_>) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, stmt: &BoundSql<'_>) -> impl Future<Output = OrmResult<u64>> + Send;

    /// First row, if any. Extra rows are ignored rather than reported.
    fn query_first(
        &self,
        stmt: &BoundSql<'_>,
    ) -> impl Future<Output = OrmResult<Option<Row>>> + Send {
        async move { Ok(self.query(stmt).await?.into_iter().next()) }
    }

    /// Token for best-effort server-side cancellation on timeout.
    fn cancel_token(&self) -> Option<CancelToken> {
        None
    }
}

macro_rules! impl_generic_client {
    ($($ty:ty),+ $(,)?) => {$(
        impl GenericClient for $ty {
            async fn query(&self, stmt: &BoundSql<'_>) -> OrmResult<Vec<Row>> {
                <$ty>::query(self, stmt.sql.as_str(), &stmt.params)
                    .await
                    .map_err(OrmError::from_db_error)
            }

            async fn execute(&self, stmt: &BoundSql<'_>) -> OrmResult<u64> {
                <$ty>::execute(self, stmt.sql.as_str(), &stmt.params)
                    .await
                    .map_err(OrmError::from_db_error)
            }

            fn cancel_token(&self) -> Option<CancelToken> {
                Some(<$ty>::cancel_token(self))
            }
        }
    )+};
}

impl_generic_client!(tokio_postgres::Client, tokio_postgres::Transaction<'_>);

impl<C: GenericClient> GenericClient for &C {
    async fn query(&self, stmt: &BoundSql<'_>) -> OrmResult<Vec<Row>> {
        (**self).query(stmt).await
    }

    async fn execute(&self, stmt: &BoundSql<'_>) -> OrmResult<u64> {
        (**self).execute(stmt).await
    }

    fn cancel_token(&self) -> Option<CancelToken> {
        (**self).cancel_token()
    }
}
