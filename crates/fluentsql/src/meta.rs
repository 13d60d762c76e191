//! Entity-to-table metadata.
//!
//! Every entity type owns exactly one [`TableDescriptor`], built at compile
//! time by `#[derive(Entity)]` and shared read-only by all builders. Derived
//! entities are also registered via `inventory` so tooling can enumerate them.

use crate::error::{OrmError, OrmResult};
use crate::param::Params;

/// One mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// SQL column name.
    pub name: &'static str,
    /// Rust field name; generated SQL aliases and binds by this name.
    pub property: &'static str,
    pub primary_key: bool,
    /// Database-generated value, never written by INSERT.
    pub identity: bool,
}

impl ColumnDescriptor {
    pub const fn new(name: &'static str, property: &'static str) -> Self {
        Self {
            name,
            property,
            primary_key: false,
            identity: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self
    }
}

/// Table name plus its columns in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub columns: &'static [ColumnDescriptor],
}

impl TableDescriptor {
    pub const fn new(name: &'static str, columns: &'static [ColumnDescriptor]) -> Self {
        Self { name, columns }
    }

    /// The single primary-key column.
    ///
    /// Statements keyed by the primary key cannot be generated for tables with
    /// zero or several key columns, so both cases are configuration errors.
    pub fn primary_key(&self) -> OrmResult<&'static ColumnDescriptor> {
        let mut keys = self.columns.iter().filter(|c| c.primary_key);
        match (keys.next(), keys.next()) {
            (Some(pk), None) => Ok(pk),
            (None, _) => Err(OrmError::config(format!(
                "no primary key found for table `{}`",
                self.name
            ))),
            (Some(_), Some(_)) => Err(OrmError::config(format!(
                "table `{}` declares more than one primary key",
                self.name
            ))),
        }
    }

    /// Look up a column by its property name.
    pub fn column_by_property(&self, property: &str) -> Option<&'static ColumnDescriptor> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Look up a column by its SQL name.
    pub fn column(&self, name: &str) -> Option<&'static ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A struct mapped to a table.
///
/// Usually implemented with `#[derive(Entity)]`.
pub trait Entity: Send + Sync + 'static {
    /// Metadata for the mapped table.
    fn table() -> &'static TableDescriptor;

    /// Bind every mapped field under its property name.
    fn to_params(&self) -> OrmResult<Params>;
}

/// Registration submitted by `#[derive(Entity)]`.
pub struct EntityRegistration {
    pub table: fn() -> &'static TableDescriptor,
}

inventory::collect!(EntityRegistration);

/// All entity tables registered in this binary.
pub fn registered_tables() -> Vec<&'static TableDescriptor> {
    let mut tables: Vec<_> = inventory::iter::<EntityRegistration>
        .into_iter()
        .map(|reg| (reg.table)())
        .collect();
    tables.sort_by_key(|t| t.name);
    tables
}

/// Find a registered table by SQL name.
pub fn find_table(name: &str) -> Option<&'static TableDescriptor> {
    inventory::iter::<EntityRegistration>
        .into_iter()
        .map(|reg| (reg.table)())
        .find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    static KEYLESS: TableDescriptor = TableDescriptor::new(
        "audit_log",
        &[
            ColumnDescriptor::new("message", "message"),
            ColumnDescriptor::new("created_at", "created_at"),
        ],
    );

    static DOUBLE_KEY: TableDescriptor = TableDescriptor::new(
        "memberships",
        &[
            ColumnDescriptor::new("user_id", "user_id").primary_key(),
            ColumnDescriptor::new("group_id", "group_id").primary_key(),
        ],
    );

    static USERS: TableDescriptor = TableDescriptor::new(
        "users",
        &[
            ColumnDescriptor::new("user_id", "id").primary_key().identity(),
            ColumnDescriptor::new("user_name", "name"),
        ],
    );

    #[test]
    fn primary_key_is_resolved() {
        let pk = USERS.primary_key().unwrap();
        assert_eq!(pk.name, "user_id");
        assert_eq!(pk.property, "id");
        assert!(pk.identity);
    }

    #[test]
    fn missing_primary_key_is_config_error() {
        let err = KEYLESS.primary_key().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("no primary key"));
    }

    #[test]
    fn composite_primary_key_is_config_error() {
        assert!(DOUBLE_KEY.primary_key().unwrap_err().is_config());
    }

    #[test]
    fn columns_are_found_by_either_name() {
        assert_eq!(USERS.column_by_property("name").map(|c| c.name), Some("user_name"));
        assert_eq!(USERS.column("user_name").map(|c| c.property), Some("name"));
        assert!(USERS.column("name").is_none());
    }
}
