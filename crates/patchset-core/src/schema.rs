// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Schema descriptors for record types and request shapes.
//!
//! A record type describes a persisted row; a request shape describes the
//! caller-facing fields of one read or mutation. Both publish a static
//! descriptor table that the runtime parses once. `#[derive(Resource)]` and
//! `#[derive(Request)]` generate these tables from attributes, but they can
//! also be written by hand.
//!
//! # Example
//!
//! ```rust
//! use patchset_core::{
//!     Config, DbType, FieldDescriptor, Request, RequestField, Resource, ResourceName, Value
//! };
//!
//! #[derive(Default)]
//! struct Account {
//!     id:   i64,
//!     name: String
//! }
//!
//! impl Resource for Account {
//!     fn resource_name() -> ResourceName {
//!         ResourceName::from_static("Accounts")
//!     }
//!
//!     fn default_config() -> Config {
//!         Config::new(DbType::Spanner)
//!     }
//!
//!     fn fields() -> &'static [FieldDescriptor] {
//!         const FIELDS: &[FieldDescriptor] = &[
//!             FieldDescriptor::new("id", Some("Id")),
//!             FieldDescriptor::new("name", Some("Name"))
//!         ];
//!         FIELDS
//!     }
//!
//!     fn field_value(&self, field: &str) -> Option<Value> {
//!         match field {
//!             "id" => Some(self.id.into()),
//!             "name" => Some(self.name.clone().into()),
//!             _ => None
//!         }
//!     }
//! }
//!
//! struct AccountView;
//!
//! impl Request for AccountView {
//!     fn request_fields() -> &'static [RequestField] {
//!         const FIELDS: &[RequestField] = &[
//!             RequestField::new("id").json("id"),
//!             RequestField::new("name").json("name").perm("Read")
//!         ];
//!         FIELDS
//!     }
//! }
//!
//! assert_eq!(Account::fields().len(), 2);
//! assert_eq!(AccountView::request_fields()[1].perm, Some("Read"));
//! ```

use crate::{Config, ResourceName, Value, search::SearchType};

/// One field of a record type, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Logical field name.
    pub name:   &'static str,
    /// Storage column, or `None` when the field is not persisted.
    pub column: Option<&'static str>
}

impl FieldDescriptor {
    /// Describe a field.
    #[must_use]
    pub const fn new(name: &'static str, column: Option<&'static str>) -> Self {
        Self {
            name,
            column
        }
    }
}

/// A persisted record type.
///
/// `Default` supplies the zero-valued instance that create change sets are
/// diffed against.
pub trait Resource: Default + Send + Sync + 'static {
    /// Table and base resource name.
    fn resource_name() -> ResourceName;

    /// Configuration declared with the type.
    fn default_config() -> Config;

    /// Effective configuration.
    ///
    /// Override to replace the declared configuration, for example with
    /// values loaded at startup.
    fn config() -> Config {
        Self::default_config()
    }

    /// Every field of the type, in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Current value of `field`, or `None` if the type has no such field.
    fn field_value(&self, field: &str) -> Option<Value>;
}

/// Search index keys declared on a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTag {
    /// Search kind the keys support.
    pub kind: SearchType,
    /// Comma-separated index column names.
    pub keys: &'static str
}

/// One field of a request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestField {
    /// Logical field name; matches the record type's field name.
    pub name:   &'static str,
    /// Raw JSON name; text after the first comma is ignored, `"-"` hides the
    /// field.
    pub json:   Option<&'static str>,
    /// Raw comma-separated permission tokens.
    pub perm:   Option<&'static str>,
    /// Search index keys.
    pub search: &'static [SearchTag]
}

impl RequestField {
    /// Describe a field with no JSON name, permissions or search keys.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            json: None,
            perm: None,
            search: &[]
        }
    }

    /// Set the raw JSON name.
    #[must_use]
    pub const fn json(mut self, json: &'static str) -> Self {
        self.json = Some(json);
        self
    }

    /// Set the raw permission tokens.
    #[must_use]
    pub const fn perm(mut self, perm: &'static str) -> Self {
        self.perm = Some(perm);
        self
    }

    /// Set the search index keys.
    #[must_use]
    pub const fn search(mut self, search: &'static [SearchTag]) -> Self {
        self.search = search;
        self
    }

    /// JSON name with options stripped, or `""` when absent.
    #[must_use]
    pub fn json_name(&self) -> &'static str {
        match self.json {
            Some(json) => json.split_once(',').map_or(json, |(name, _)| name),
            None => ""
        }
    }
}

/// A request shape: the caller-facing fields of one operation.
pub trait Request {
    /// Every field of the shape, in declaration order.
    fn request_fields() -> &'static [RequestField];
}
