//! Named parameter storage.
//!
//! Generated SQL refers to values as `@key`; [`Params`] maps each key to a
//! clone-friendly [`Param`]. Keys are unique for the lifetime of one query and
//! are never overwritten once bound.

use crate::error::{OrmError, OrmResult};
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A clone-friendly parameter wrapper using Arc.
#[derive(Clone)]
pub struct Param(pub(crate) Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Create a new parameter from any ToSql value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// Get a reference to the inner value as a ToSql trait object.
    pub fn as_ref(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `ToSql: Debug`, so the bound value itself is printable.
        std::fmt::Debug::fmt(&*self.0, f)
    }
}

/// Ordered map from parameter key (without the `@` sigil) to bound value.
#[derive(Clone, Debug, Default)]
pub struct Params {
    entries: Vec<(String, Param)>,
}

impl Params {
    /// Create a new empty parameter map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Bind `value` under `key`.
    ///
    /// Fails if the key is not a plain identifier or is already bound.
    pub fn insert<T: ToSql + Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> OrmResult<()> {
        self.insert_param(key, Param::new(value))
    }

    /// Bind a pre-wrapped [`Param`] under `key`.
    pub fn insert_param(&mut self, key: impl Into<String>, param: Param) -> OrmResult<()> {
        let key = key.into();
        if !is_valid_key(&key) {
            return Err(OrmError::validation(format!(
                "invalid parameter key '{key}' (expected [A-Za-z_][A-Za-z0-9_]*)"
            )));
        }
        if self.contains_key(&key) {
            return Err(OrmError::DuplicateParameter(key));
        }
        self.entries.push((key, param));
        Ok(())
    }

    /// Bind `param` under a freshly generated key derived from `hint` and
    /// return that key.
    ///
    /// Keys take the form `<hint><n>` where `n` starts at the current map size
    /// and is bumped until the key is unused.
    pub fn bind(&mut self, hint: &str, param: Param) -> String {
        let base = if is_valid_key(hint) { hint } else { "p" };
        let mut n = self.entries.len();
        let mut key = format!("{base}{n}");
        while self.contains_key(&key) {
            n += 1;
            key = format!("{base}{n}");
        }
        self.entries.push((key.clone(), param));
        key
    }

    /// Look up a bound value.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    /// Whether `key` is already bound.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Iterate over bound keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), p))
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `other` into this map.
    ///
    /// A key present in both maps is an error; nothing is overwritten.
    pub fn merge(&mut self, other: &Params) -> OrmResult<()> {
        for (key, _) in &other.entries {
            if self.contains_key(key) {
                return Err(OrmError::DuplicateParameter(key.clone()));
            }
        }
        self.entries.extend(other.entries.iter().cloned());
        Ok(())
    }
}

pub(crate) fn is_valid_key(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_suffixes_with_running_count() {
        let mut params = Params::new();
        assert_eq!(params.bind("age", Param::new(18_i32)), "age0");
        assert_eq!(params.bind("age", Param::new(65_i32)), "age1");
        assert_eq!(params.bind("name", Param::new("bob")), "name2");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn bind_skips_keys_taken_by_explicit_inserts() {
        let mut params = Params::new();
        params.insert("age1", 1_i32).unwrap();
        // len == 1 -> "age1" is taken, so the counter moves on.
        assert_eq!(params.bind("age", Param::new(2_i32)), "age2");
    }

    #[test]
    fn insert_rejects_duplicates_and_keeps_first_value() {
        let mut params = Params::new();
        params.insert("id", 1_i64).unwrap();
        let err = params.insert("id", 2_i64).unwrap_err();
        assert!(matches!(err, OrmError::DuplicateParameter(ref k) if k == "id"));
        assert_eq!(format!("{:?}", params.get("id").unwrap()), "1");
    }

    #[test]
    fn insert_rejects_non_identifier_keys() {
        let mut params = Params::new();
        assert!(params.insert("1abc", 1_i32).is_err());
        assert!(params.insert("a-b", 1_i32).is_err());
        assert!(params.insert("", 1_i32).is_err());
    }

    #[test]
    fn bind_falls_back_for_unusable_hint() {
        let mut params = Params::new();
        assert_eq!(params.bind("count(*)", Param::new(1_i64)), "p0");
    }

    #[test]
    fn merge_refuses_collisions() {
        let mut a = Params::new();
        a.insert("id", 1_i64).unwrap();
        let mut b = Params::new();
        b.insert("name", "x").unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["id", "name"]);

        let mut c = Params::new();
        c.insert("id", 9_i64).unwrap();
        assert!(a.merge(&c).is_err());
        assert_eq!(a.len(), 2);
    }
}
