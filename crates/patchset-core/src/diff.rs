// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Match and diff engine.
//!
//! [`matches`] compares two values of the same [`Shape`](crate::Shape). Comparing
//! different shapes is a defect and fails with
//! [`Error::IncomparableTypes`]; it never reports "unequal".
//!
//! | Shape | Rule |
//! |-------|------|
//! | scalar | value equality |
//! | optional | two `None` equal, one `None` unequal, else compare |
//! | list | lengths first, then element by element |
//! | text | byte equality of the canonical text |
//!
//! [`diff`] walks only the staged fields and keeps those whose stored value
//! does not match.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Error, Field, FieldSet, Resource, Result, Scalar, Text, Value};

/// Before and after values of one changed field.
///
/// Serialized with `Old` and `New` keys; a missing side is omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffElem {
    /// Stored value, absent for inserts.
    #[serde(rename = "Old", skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    /// Staged value, absent for deletes.
    #[serde(rename = "New", skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>
}

impl DiffElem {
    /// A change from `old` to `new`.
    #[must_use]
    pub const fn changed(old: Value, new: Value) -> Self {
        Self {
            old: Some(old),
            new: Some(new)
        }
    }

    /// A value that appeared.
    #[must_use]
    pub const fn added(new: Value) -> Self {
        Self {
            old: None,
            new: Some(new)
        }
    }

    /// A value that disappeared.
    #[must_use]
    pub const fn removed(old: Value) -> Self {
        Self {
            old: Some(old),
            new: None
        }
    }
}

/// Changed fields keyed by logical field name.
pub type ChangeSet = BTreeMap<Field, DiffElem>;

/// Compare two values of the same shape.
///
/// # Errors
///
/// Returns [`Error::IncomparableTypes`] when the shapes differ.
///
/// # Example
///
/// ```rust
/// use patchset_core::{Value, diff::matches};
///
/// assert!(matches(&Value::from(Some(1_i32)), &Value::from(Some(1_i32))).unwrap());
/// assert!(!matches(&Value::from(vec![1_i32]), &Value::from(vec![1_i32, 2])).unwrap());
/// assert!(matches(&Value::from(1_i32), &Value::from(1_i64)).is_err());
/// ```
pub fn matches(old: &Value, new: &Value) -> Result<bool> {
    let (old_shape, new_shape) = (old.shape(), new.shape());
    if old_shape != new_shape {
        return Err(Error::IncomparableTypes {
            old: old_shape,
            new: new_shape
        });
    }

    let equal = match (old, new) {
        (Value::Scalar(a), Value::Scalar(b)) => scalar_eq(a, b),
        (Value::Optional(_, a), Value::Optional(_, b)) => optional_eq(a.as_ref(), b.as_ref(), scalar_eq),
        (Value::List(_, a), Value::List(_, b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| scalar_eq(x, y))
        }
        (Value::OptionalList(_, a), Value::OptionalList(_, b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b)
                    .all(|(x, y)| optional_eq(x.as_ref(), y.as_ref(), scalar_eq))
        }
        (Value::Text(a), Value::Text(b)) => text_eq(a, b),
        (Value::OptionalText(_, a), Value::OptionalText(_, b)) => optional_eq(a.as_ref(), b.as_ref(), text_eq),
        _ => {
            return Err(Error::IncomparableTypes {
                old: old_shape,
                new: new_shape
            });
        }
    };
    Ok(equal)
}

fn scalar_eq(a: &Scalar, b: &Scalar) -> bool {
    a == b
}

fn text_eq(a: &Text, b: &Text) -> bool {
    a.as_str().as_bytes() == b.as_str().as_bytes()
}

fn optional_eq<T>(a: Option<&T>, b: Option<&T>, eq: fn(&T, &T) -> bool) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => eq(a, b),
        _ => false
    }
}

/// Fields of `staged` whose value differs from the stored record `old`.
///
/// # Errors
///
/// - [`Error::FieldNotInRecord`] if a staged field does not exist on `R`
/// - [`Error::IncomparableTypes`] if a staged value has a different shape
///   than the stored one
///
/// # Example
///
/// ```rust,ignore
/// // stored {x: 4, y: "b", z: true}, staged {x: 5, y: "b"}
/// let changes = diff(&stored, &staged)?;
/// assert_eq!(changes.len(), 1); // only x
/// ```
pub fn diff<R: Resource>(old: &R, staged: &FieldSet) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();
    for (field, new) in staged.iter() {
        let stored = old.field_value(field.as_str()).ok_or_else(|| Error::FieldNotInRecord {
            field:    field.clone(),
            resource: R::resource_name()
        })?;

        if !matches(&stored, new)? {
            changes.insert(field.clone(), DiffElem::changed(stored, new.clone()));
        }
    }
    Ok(changes)
}

/// Change set of a newly created record: every staged value that differs
/// from the zero-valued record, recorded without an old side.
///
/// # Errors
///
/// Same as [`diff`].
pub fn create_change_set<R: Resource>(staged: &FieldSet) -> Result<ChangeSet> {
    let changes = diff(&R::default(), staged)?;
    Ok(changes
        .into_iter()
        .filter_map(|(field, elem)| elem.new.map(|new| (field, DiffElem::added(new))))
        .collect())
}

/// Change set of a deleted record: every non-zero value of `fields`,
/// recorded without a new side.
#[must_use]
pub fn delete_change_set<R: Resource>(old: &R, fields: &[Field]) -> ChangeSet {
    fields
        .iter()
        .filter_map(|field| {
            old.field_value(field.as_str())
                .filter(|value| !value.is_zero())
                .map(|value| (field.clone(), DiffElem::removed(value)))
        })
        .collect()
}
