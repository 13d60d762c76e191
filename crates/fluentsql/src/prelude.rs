//! Convenient imports for typical `fluentsql` usage.
//!
//! ```ignore
//! use fluentsql::prelude::*;
//! ```

pub use crate::{
    Dialect, Entity, Expr, Field, FromRow, GenericClient, Lock, OrmError, OrmResult, PgSession,
    Query, Session, SessionConfig, count_all,
};
