// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Error type shared by every component of the crate.
//!
//! Variants are grouped by [`ErrorKind`] so callers can map failures to
//! transport-level responses without matching on individual variants:
//!
//! | Kind | Typical cause | Caller action |
//! |------|---------------|---------------|
//! | `Configuration` | Malformed schema descriptor, conflicting permissions | Fix the code |
//! | `Request` | Unknown column, unsupported dialect or search kind | Reject request |
//! | `BadRequest` | Patch without key, update without changes | Reject request |
//! | `NotFound` | Key-based read found no row | Report missing row |
//! | `Forbidden` | Authorization oracle denied access | Report denial |
//! | `TypeMismatch` | Diff of incompatible value shapes | Fix the code |
//! | `Database` | Database or oracle failure, serialization | Propagate |
//!
//! Nothing in this crate retries; every error reaches the immediate caller.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    access::{Field, Permission, ResourceName, Tag},
    config::DbType,
    search::SearchType,
    value::Shape
};

/// Boxed source error from a collaborator (database client, enforcer).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Programmer error in a schema descriptor or registration.
    Configuration,
    /// Request that can never be served as written.
    Request,
    /// Patch state that cannot be applied.
    BadRequest,
    /// Row addressed by key does not exist.
    NotFound,
    /// Authorization oracle denied access.
    Forbidden,
    /// Diff engine was handed two incomparable values.
    TypeMismatch,
    /// Failure in an external collaborator.
    Database
}

impl ErrorKind {
    /// Stable snake_case name, suitable for logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Request => "request",
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::TypeMismatch => "type_mismatch",
            Self::Database => "database"
        }
    }
}

/// Errors produced by metadata, permission, query and patch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A request field's permission tag names `Delete`.
    #[error("delete permission is not allowed in permission tag of field {field}")]
    DeletePermissionInTag {
        /// Offending request field.
        field: Field
    },

    /// A permission was attached to a field with an empty or skipped JSON name.
    #[error("can not set {permission} permission on the {field} field when json tag is empty")]
    PermissionWithoutTag {
        /// Permission that was requested.
        permission: Permission,
        /// Offending request field.
        field:      Field
    },

    /// More than one distinct viewing permission in one request shape.
    #[error("can not have more than one type of viewing permission in the same request: found {}", join(.0))]
    MultipleViewingPermissions(Vec<Permission>),

    /// Viewing and mutating permissions in one request shape.
    #[error(
        "can not have both viewing and mutating permissions in the same request: found {} and {}",
        join(.viewing),
        join(.mutating)
    )]
    MixedPermissions {
        /// Viewing permissions found.
        viewing:  Vec<Permission>,
        /// Mutating permissions found.
        mutating: Vec<Permission>
    },

    /// Two request fields map to the same JSON name.
    #[error("json name {tag} of field {field} collides with another field")]
    DuplicateTag {
        /// Colliding JSON name.
        tag:   Tag,
        /// Field that caused the collision.
        field: Field
    },

    /// Resource permission registered twice in a collection.
    #[error("found existing entry under resource: {resource} and permission: {permission}")]
    DuplicateResourcePermission {
        /// Resource being registered.
        resource:   ResourceName,
        /// Permission being registered.
        permission: Permission
    },

    /// Tag permission registered twice in a collection.
    #[error(
        "found existing mapping between tag ({tag}) and permission ({permission}) under resource ({resource})"
    )]
    DuplicateTagPermission {
        /// Resource being registered.
        resource:   ResourceName,
        /// Tag being registered.
        tag:        Tag,
        /// Permission being registered.
        permission: Permission
    },

    /// Attempt to register the empty permission.
    #[error("cannot register null permission")]
    NullPermission,

    /// Field has no column in the record's metadata.
    #[error("field {field} not found in {resource}")]
    UnknownField {
        /// Requested field.
        field:    Field,
        /// Record type searched.
        resource: ResourceName
    },

    /// Column name in a projection request matched no request field.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// Statement requested for a dialect the record is not configured for.
    #[error("can only render {expected} statements for dbType {expected}, got {actual}")]
    WrongDialect {
        /// Dialect the caller asked for.
        expected: DbType,
        /// Dialect the record is configured for.
        actual:   DbType
    },

    /// Search predicate on a dialect that has no search statement.
    #[error("search is not supported for dbType {0}")]
    SearchUnsupported(DbType),

    /// Recognised but unimplemented search kind.
    #[error("{0} search is not yet implemented")]
    SearchNotImplemented(SearchType),

    /// Patch resolved without any key component.
    #[error("PatchSet must include at least one primary key")]
    MissingKey,

    /// Patch applied without a patch type.
    #[error("PatchSet for {0} has no patch type")]
    MissingPatchType(ResourceName),

    /// Update whose staged values equal the stored row.
    #[error("No changes to apply for {resource} ({key})")]
    NoChanges {
        /// Record type.
        resource: ResourceName,
        /// Rendered key, `"field: value, ..."`.
        key:      String
    },

    /// Change tracking enabled but no event source supplied.
    #[error("event source must be supplied when change tracking is enabled for {0}")]
    MissingEventSource(ResourceName),

    /// Key-based read found no row.
    #[error("{resource} ({key}) not found")]
    NotFound {
        /// Record type.
        resource: ResourceName,
        /// Rendered key, `"field: value, ..."`.
        key:      String
    },

    /// Authorization oracle denied access.
    #[error("{0}")]
    Forbidden(String),

    /// Update touches a field that can only be set on create.
    #[error("field {field} of {resource} is immutable")]
    ImmutableField {
        /// Staged field.
        field:    Field,
        /// Record type.
        resource: ResourceName
    },

    /// Diff engine was asked to compare values of different shapes.
    #[error("attempted to diff incomparable types, old: {old}, new: {new}")]
    IncomparableTypes {
        /// Shape of the stored value.
        old: Shape,
        /// Shape of the staged value.
        new: Shape
    },

    /// Staged field has no counterpart on the stored record.
    #[error("field {field} in patch does not exist in {resource}")]
    FieldNotInRecord {
        /// Staged field.
        field:    Field,
        /// Record type.
        resource: ResourceName
    },

    /// Failure reported by the database client.
    #[error("database error: {0}")]
    Database(#[source] BoxError),

    /// Failure reported by the authorization oracle.
    #[error("enforcer error: {0}")]
    Enforcer(#[source] BoxError),

    /// Change set could not be encoded as JSON.
    #[error("failed to encode change set: {0}")]
    Serialize(#[from] serde_json::Error)
}

impl Error {
    /// Wrap a database client failure.
    pub fn database(err: impl Into<BoxError>) -> Self {
        Self::Database(err.into())
    }

    /// Wrap an authorization oracle failure.
    pub fn enforcer(err: impl Into<BoxError>) -> Self {
        Self::Enforcer(err.into())
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DeletePermissionInTag { .. }
            | Self::PermissionWithoutTag { .. }
            | Self::MultipleViewingPermissions(_)
            | Self::MixedPermissions { .. }
            | Self::DuplicateTag { .. }
            | Self::DuplicateResourcePermission { .. }
            | Self::DuplicateTagPermission { .. }
            | Self::NullPermission
            | Self::UnknownField { .. }
            | Self::FieldNotInRecord { .. } => ErrorKind::Configuration,
            Self::UnknownColumn(_)
            | Self::WrongDialect { .. }
            | Self::SearchUnsupported(_)
            | Self::SearchNotImplemented(_) => ErrorKind::Request,
            Self::MissingKey
            | Self::MissingPatchType(_)
            | Self::NoChanges { .. }
            | Self::MissingEventSource(_)
            | Self::ImmutableField { .. } => ErrorKind::BadRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::IncomparableTypes { .. } => ErrorKind::TypeMismatch,
            Self::Database(_) | Self::Enforcer(_) | Self::Serialize(_) => ErrorKind::Database
        }
    }

    /// Check if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }

    /// Check if this is a bad-request error.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(self.kind(), ErrorKind::BadRequest | ErrorKind::Request)
    }

    /// Check if this is a forbidden error.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self.kind(), ErrorKind::Forbidden)
    }
}

fn join(perms: &[Permission]) -> String {
    perms
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
