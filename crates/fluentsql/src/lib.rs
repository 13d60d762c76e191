//! # fluentsql
//!
//! A fluent, type-checked query builder that assembles parameterized SQL from
//! typed predicates and runs it through a thin session abstraction.
//!
//! ## Features
//!
//! - **Typed predicates**: `User::AGE.ge(18) & User::NAME.like("a%")` is checked against the
//!   entity's field types at compile time
//! - **Named parameters**: literals are bound as `@name`, never spliced into SQL text
//! - **Whole-statement assembly**: SELECT / INSERT / UPDATE / DELETE / COUNT / EXISTS / SUM
//!   from one accumulated builder
//! - **Build-only mode**: a builder without a session assembles SQL and returns empty results
//! - **Transaction-friendly**: [`PgSession`] wraps anything implementing [`GenericClient`]
//!
//! ## Example
//!
//! ```ignore
//! use fluentsql::prelude::*;
//!
//! #[derive(Entity, FromRow)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id, identity)]
//!     id: i64,
//!     name: String,
//!     age: i32,
//! }
//!
//! let session = PgSession::new(client);
//!
//! let adults: Vec<User> = session
//!     .from::<User>()
//!     .and_where(User::AGE.ge(18))
//!     .order_by(User::NAME)
//!     .select()
//!     .await?;
//!
//! session
//!     .from::<User>()
//!     .set(User::AGE, 40)
//!     .and_where(User::ID.eq(7))
//!     .update()
//!     .await?;
//! ```

pub mod bind;
pub mod client;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod meta;
pub mod param;
pub mod prelude;
pub mod query;
pub mod row;
pub mod session;

pub use bind::{BoundSql, bind_named};
pub use client::GenericClient;
pub use dialect::{Dialect, Lock};
pub use error::{OrmError, OrmResult};
pub use expr::{Aliased, Column, Expr, Field, Predicate, Projection, SelectItem, ValueExpr, count_all};
pub use meta::{
    ColumnDescriptor, Entity, EntityRegistration, TableDescriptor, find_table, registered_tables,
};
pub use param::{Param, Params};
pub use query::{Paging, Query};
pub use row::{FromRow, RowExt};
pub use session::{Detached, PgSession, Session, SessionConfig};

#[cfg(feature = "derive")]
pub use fluentsql_derive::{Entity, FromRow};

// Re-exports for use by derive macros
#[doc(hidden)]
pub use inventory;
#[doc(hidden)]
pub use tokio_postgres;
