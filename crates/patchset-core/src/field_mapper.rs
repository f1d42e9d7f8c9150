// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! JSON name to field lookup for request shapes.

use std::collections::HashMap;

use crate::{Error, Field, Request, Result, Tag};

/// Maps the JSON names of a request shape back to its fields.
///
/// A field with a JSON name is reachable by that name only. A field without
/// one is reachable by its field name and by the lowercase form of it.
/// Fields named `"-"` are hidden.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    by_name: HashMap<String, Field>,
    fields:  Vec<Field>
}

impl FieldMapper {
    /// Build the mapper for request shape `Q`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTag`] when two fields resolve to the same
    /// name.
    pub fn new<Q: Request>() -> Result<Self> {
        let mut mapper = Self::default();

        for request_field in Q::request_fields() {
            let field = Field::from_static(request_field.name);
            let json = request_field.json_name();

            if json == "-" {
                continue;
            }

            if json.is_empty() {
                mapper.insert(request_field.name.to_owned(), &field)?;
                let lower = request_field.name.to_lowercase();
                if lower != request_field.name {
                    mapper.insert(lower, &field)?;
                }
            } else {
                mapper.insert(json.to_owned(), &field)?;
            }
            mapper.fields.push(field);
        }

        Ok(mapper)
    }

    fn insert(&mut self, name: String, field: &Field) -> Result<()> {
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateTag {
                tag:   Tag::from(name),
                field: field.clone()
            });
        }
        self.by_name.insert(name, field.clone());
        Ok(())
    }

    /// Field reachable by `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name)
    }

    /// Visible fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of reachable names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check whether no name is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestField;

    struct Shape;

    impl Request for Shape {
        fn request_fields() -> &'static [RequestField] {
            const FIELDS: &[RequestField] = &[
                RequestField::new("id").json("id"),
                RequestField::new("Description"),
                RequestField::new("internal").json("-"),
                RequestField::new("display_name").json("displayName,omitempty")
            ];
            FIELDS
        }
    }

    struct Colliding;

    impl Request for Colliding {
        fn request_fields() -> &'static [RequestField] {
            const FIELDS: &[RequestField] = &[
                RequestField::new("a").json("name"),
                RequestField::new("b").json("name")
            ];
            FIELDS
        }
    }

    #[test]
    fn maps_json_and_fallback_names() {
        let mapper = FieldMapper::new::<Shape>().unwrap();
        assert_eq!(mapper.field("id").map(Field::as_str), Some("id"));
        assert_eq!(mapper.field("Description").map(Field::as_str), Some("Description"));
        assert_eq!(mapper.field("description").map(Field::as_str), Some("Description"));
        assert_eq!(mapper.field("displayName").map(Field::as_str), Some("display_name"));
        assert!(mapper.field("internal").is_none());
        assert!(mapper.field("display_name").is_none());
        assert_eq!(mapper.fields().len(), 3);
        assert_eq!(mapper.len(), 4);
    }

    #[test]
    fn rejects_collisions() {
        let err = FieldMapper::new::<Colliding>().unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { .. }));
    }
}
