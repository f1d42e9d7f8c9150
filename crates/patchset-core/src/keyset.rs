// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Single or composite primary keys.

use std::{collections::BTreeMap, fmt};

use crate::{Field, Value};

/// One column of a primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPart {
    /// Logical field name.
    pub key:   Field,
    /// Key value.
    pub value: Value
}

/// Ordered list of key parts identifying one row.
///
/// Order is significant: it determines both the row identifier written to
/// the audit log and the order of values in the database-native [`Key`].
///
/// # Example
///
/// ```rust
/// use patchset_core::KeySet;
///
/// let key = KeySet::new("a", 1_i64).add("b", 2_i64);
/// assert_eq!(key.row_id(), "1|2");
/// assert_eq!(key.to_string(), "a: 1, b: 2");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySet {
    parts: Vec<KeyPart>
}

/// Database-native key: the key values in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Key(pub Vec<Value>);

impl KeySet {
    /// Create a single-part key.
    pub fn new(key: impl Into<Field>, value: impl Into<Value>) -> Self {
        Self::default().add(key, value)
    }

    /// Return a key extended by one more part.
    #[must_use]
    pub fn add(mut self, key: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.parts.push(KeyPart {
            key:   key.into(),
            value: value.into()
        });
        self
    }

    /// Values joined with `|`, or `""` for an empty key.
    #[must_use]
    pub fn row_id(&self) -> String {
        self.parts
            .iter()
            .map(|part| part.value.to_string())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Database-native representation.
    #[must_use]
    pub fn key(&self) -> Key {
        Key(self.parts.iter().map(|part| part.value.clone()).collect())
    }

    /// Key values by field.
    #[must_use]
    pub fn key_map(&self) -> BTreeMap<Field, Value> {
        self.parts
            .iter()
            .map(|part| (part.key.clone(), part.value.clone()))
            .collect()
    }

    /// Key fields in order.
    pub fn keys(&self) -> impl Iterator<Item = &Field> {
        self.parts.iter().map(|part| &part.key)
    }

    /// Key parts in order.
    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Number of key parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check whether the key has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", part.key, part.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_preserves_order() {
        let key = KeySet::new("b", "x").add("a", 2_i32);
        let fields: Vec<&str> = key.keys().map(Field::as_str).collect();
        assert_eq!(fields, ["b", "a"]);
        assert_eq!(key.row_id(), "x|2");
        assert_eq!(key.len(), 2);
    }

    #[test]
    fn empty_key() {
        let key = KeySet::default();
        assert!(key.is_empty());
        assert_eq!(key.row_id(), "");
        assert_eq!(key.to_string(), "");
    }

    #[test]
    fn native_key_and_map() {
        let key = KeySet::new("Id", 5_i64).add("Region", "eu");
        assert_eq!(key.key(), Key(vec![Value::from(5_i64), Value::from("eu")]));
        let map = key.key_map();
        assert_eq!(map.get(&Field::from("Region")), Some(&Value::from("eu")));
    }

    #[test]
    fn display_lists_parts() {
        let key = KeySet::new("Id", 5_i64).add("Region", "eu");
        assert_eq!(key.to_string(), "Id: 5, Region: eu");
    }
}
