// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Insertion-ordered field/value map.

use std::collections::HashMap;

use crate::{Field, KeySet, Value};

/// Mapping from field to value that remembers first-set order.
///
/// Setting a field again replaces its value but keeps its original
/// position, so statements rendered from a `FieldSet` list columns
/// deterministically.
///
/// # Example
///
/// ```rust
/// use patchset_core::{Field, FieldSet, Value};
///
/// let mut set = FieldSet::new();
/// set.set("Name", "a");
/// set.set("Age", 3_i64);
/// set.set("Name", "b");
///
/// let fields: Vec<&str> = set.fields().iter().map(Field::as_str).collect();
/// assert_eq!(fields, ["Name", "Age"]);
/// assert_eq!(set.get("Name"), Some(&Value::from("b")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    data:   HashMap<Field, Value>,
    fields: Vec<Field>
}

impl FieldSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a value, keeping the field's first-set position.
    pub fn set(&mut self, field: impl Into<Field>, value: impl Into<Value>) {
        let field = field.into();
        if !self.data.contains_key(&field) {
            self.fields.push(field.clone());
        }
        self.data.insert(field, value.into());
    }

    /// Value staged for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Check whether `field` has been staged.
    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Staged fields in first-set order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of staged fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate `(field, value)` pairs in first-set order.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.fields
            .iter()
            .filter_map(|field| self.data.get(field).map(|value| (field, value)))
    }

    /// Convert to a key, one part per staged field in order.
    #[must_use]
    pub fn key_set(&self) -> KeySet {
        self.iter()
            .fold(KeySet::default(), |keys, (field, value)| {
                keys.add(field.clone(), value.clone())
            })
    }
}
