//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`.
/// Generated SELECTs alias every column to its property name, so derived
/// implementations read each field by its Rust name.
///
/// # Example
///
/// ```ignore
/// use fluentsql::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Same as [`try_get_column`](RowExt::try_get_column), by position.
    fn try_get_index<T>(&self, index: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, index: usize) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(index).map_err(|e| {
            let column = self
                .columns()
                .get(index)
                .map_or_else(|| format!("#{index}"), |c| c.name().to_string());
            OrmError::decode(column, e.to_string())
        })
    }
}

// Single-column results (`select_raw::<i64>("COUNT(1)")`, `select_as(User::NAME)`)
// decode the first column directly.
macro_rules! impl_scalar_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row) -> OrmResult<Self> {
                    row.try_get_index(0)
                }
            }
        )*
    };
}

impl_scalar_from_row!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    Vec<u8>,
    uuid::Uuid,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
);

impl<T> FromRow for Option<T>
where
    T: for<'a> FromSql<'a>,
{
    fn from_row(row: &Row) -> OrmResult<Self> {
        row.try_get_index(0)
    }
}
