//! Derive macros for fluentsql
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;

/// Derive `FromRow` for a struct.
///
/// Each field is read from the result column carrying the field's name, which
/// is the alias fluentsql gives every generated SELECT column.
///
/// # Example
///
/// ```ignore
/// use fluentsql::FromRow;
///
/// #[derive(FromRow)]
/// struct UserSummary {
///     name: String,
///     total: i64,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `Entity` metadata for a struct.
///
/// # Example
///
/// ```ignore
/// use fluentsql::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id, identity, column = "user_id")]
///     id: i64,
///     name: String,
///     email: Option<String>,
/// }
/// ```
///
/// # Generated
///
/// - `User::ID`, `User::NAME`, `User::EMAIL`: typed `Column<User, T>` constants
/// - `impl Entity for User`: a static table descriptor and `to_params`, which
///   binds every field under its name
/// - a registration visible through `fluentsql::registered_tables()`
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (required)
/// - `#[orm(id)]` - Primary key (at most one)
/// - `#[orm(identity)]` - Database-generated; left out of INSERT
/// - `#[orm(column = "name")]` - Column name when it differs from the field name
///
/// Every field type must be `Clone` and implement `ToSql`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
