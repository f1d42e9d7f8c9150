// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Access-control primitives.
//!
//! Thin string newtypes shared by the permission parser, the query builder
//! and the authorization boundary. They carry no validation beyond what the
//! individual constructors document; the authorization backend owns their
//! meaning.
//!
//! # Overview
//!
//! - [`Field`]: logical field name of a record or request shape
//! - [`Tag`]: JSON-facing name of a request field, used as a permission key
//! - [`ResourceName`]: name of a record type, optionally suffixed `.tag`
//! - [`Permission`]: permission token such as `Read` or `Update`
//! - [`Domain`] / [`User`]: authorization subject context
//! - [`PermissionScope`]: global or domain-level registration

use std::{
    borrow::{Borrow, Cow},
    collections::BTreeMap,
    fmt
};

use serde::{Deserialize, Serialize};

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            /// Create from any owned or static string.
            pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
                Self(value.into())
            }

            /// Create from a static string in const context.
            #[must_use]
            pub const fn from_static(value: &'static str) -> Self {
                Self(Cow::Borrowed(value))
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Check whether the value is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&'static str> for $name {
            fn from(value: &'static str) -> Self {
                Self::from_static(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(Cow::Owned(value))
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_newtype!(
    /// Logical field name, as declared on the record or request struct.
    Field
);

string_newtype!(
    /// Request-facing field name (the JSON name) used as a permission key.
    Tag
);

string_newtype!(
    /// Name of a protected resource.
    ///
    /// A base resource is the record type's name (`"Users"`); a field-level
    /// resource appends the tag after a dot (`"Users.email"`).
    ResourceName
);

string_newtype!(
    /// Permission token understood by the authorization backend.
    Permission
);

string_newtype!(
    /// Tenant or domain the current request executes in.
    Domain
);

string_newtype!(
    /// Identity of the caller.
    User
);

impl Permission {
    /// The empty permission. Never registered, never required.
    pub const NULL: Self = Self::from_static("");
    /// Create a new record.
    pub const CREATE: Self = Self::from_static("Create");
    /// Read a single record.
    pub const READ: Self = Self::from_static("Read");
    /// List records.
    pub const LIST: Self = Self::from_static("List");
    /// Update an existing record.
    pub const UPDATE: Self = Self::from_static("Update");
    /// Delete a record. Only valid at resource level.
    pub const DELETE: Self = Self::from_static("Delete");
    /// Pseudo-permission accepted in permission tags.
    ///
    /// Rewritten to [`Permission::UPDATE`] and marks the field as
    /// unchangeable once created.
    pub const IMMUTABLE: Self = Self::from_static("Immutable");

    /// Check whether this permission mutates data (create, update, delete).
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        *self == Self::CREATE || *self == Self::UPDATE || *self == Self::DELETE
    }
}

impl ResourceName {
    /// Build the field-level resource `"{self}.{tag}"`.
    ///
    /// # Panics
    ///
    /// Panics if `tag` contains a `.`; such a resource could not be split
    /// back into its parts.
    #[must_use]
    pub fn with_tag(&self, tag: &Tag) -> Self {
        assert!(
            !tag.as_str().contains('.'),
            "invalid tag {tag:?}, must not contain '.'"
        );
        Self::from(format!("{self}.{tag}"))
    }

    /// Split a field-level resource into base resource and tag.
    ///
    /// A resource without a dot yields an empty tag.
    ///
    /// # Panics
    ///
    /// Panics if the name contains more than one `.`.
    #[must_use]
    pub fn resource_and_tag(&self) -> (Self, Tag) {
        let mut parts = self.as_str().split('.');
        let base = parts.next().unwrap_or_default().to_owned();
        let tag = parts.next().unwrap_or_default().to_owned();
        assert!(
            parts.next().is_none(),
            "invalid resource name {self:?} contains more than one '.'"
        );
        (Self::from(base), Tag::from(tag))
    }
}

/// Permissions required per request tag.
pub type TagPermissions = BTreeMap<Tag, Vec<Permission>>;

/// Level at which a resource's permissions are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// Permission applies application-wide.
    Global,
    /// Permission applies within a single domain.
    Domain
}

impl PermissionScope {
    /// Wire name of the scope.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Domain => "domain"
        }
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_constants() {
        assert_eq!(Permission::READ.as_str(), "Read");
        assert!(Permission::NULL.is_empty());
        assert!(Permission::DELETE.is_mutating());
        assert!(!Permission::LIST.is_mutating());
    }

    #[test]
    fn resource_with_tag_round_trip() {
        let res = ResourceName::from("Users");
        let field = res.with_tag(&Tag::from("email"));
        assert_eq!(field, "Users.email");

        let (base, tag) = field.resource_and_tag();
        assert_eq!(base, "Users");
        assert_eq!(tag, "email");
    }

    #[test]
    fn resource_without_tag() {
        let (base, tag) = ResourceName::from("Users").resource_and_tag();
        assert_eq!(base, "Users");
        assert!(tag.is_empty());
    }

    #[test]
    #[should_panic(expected = "more than one")]
    fn resource_with_two_dots_panics() {
        let _ = ResourceName::from("a.b.c").resource_and_tag();
    }

    #[test]
    #[should_panic(expected = "must not contain")]
    fn dotted_tag_panics() {
        let _ = ResourceName::from("Users").with_tag(&Tag::from("a.b"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Field::from("Name")).unwrap();
        assert_eq!(json, "\"Name\"");
        assert_eq!(
            serde_json::to_string(&PermissionScope::Domain).unwrap(),
            "\"domain\""
        );
    }
}
