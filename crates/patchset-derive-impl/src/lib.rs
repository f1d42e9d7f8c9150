// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Internal proc-macro implementation for `patchset`.
//!
//! Use the `patchset` crate instead; it re-exports both derives together
//! with the runtime they generate code for.
//!
//! # Derives
//!
//! | Derive | Implements | Attributes |
//! |--------|------------|------------|
//! | [`Resource`](macro@Resource) | `patchset_core::Resource` | `#[resource(...)]`, `#[column(...)]` |
//! | [`Request`](macro@Request) | `patchset_core::Request` | `#[request(...)]` |
//!
//! Generated code refers to `::patchset_core`, so crates using the derives
//! depend on `patchset-core` alongside `patchset`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod request;
mod resource;

use proc_macro::TokenStream;

/// Derive `patchset_core::Resource` for a persisted record type.
///
/// # Example
///
/// ```rust,ignore
/// use patchset::Resource;
///
/// #[derive(Debug, Default, Resource)]
/// #[resource(name = "Users", dialect = "spanner", audit_table = "DataChangeEvents", track_changes)]
/// pub struct User {
///     #[column("Id")]
///     pub id: i64,
///     #[column("Name")]
///     pub name: String,
///     #[column(skip)]
///     pub display: String
/// }
/// ```
///
/// # Struct Attributes
///
/// | Attribute | Default | Description |
/// |-----------|---------|-------------|
/// | `name` | struct name | Table and base resource name |
/// | `dialect` | `"spanner"` | `"spanner"` or `"postgres"` |
/// | `audit_table` | `""` | Audit table; required with `track_changes` |
/// | `track_changes` | off | Write an audit record per mutation |
/// | `rename_all` | none | `snake_case`, `PascalCase`, `camelCase` or `kebab-case` column names for fields without `#[column]` |
/// | `config` | none | Path of a `fn() -> Config` returned by `Resource::config` |
///
/// # Field Attributes
///
/// - `#[column("Name")]`: stored in column `Name`
/// - `#[column(skip)]`: not stored, still compared when diffing, so the type
///   must convert into a `Value`
/// - `#[column(ignore)]`: not described at all; use it for caches and handles
///   whose type has no `Value` conversion
///
/// Every described field type, skipped ones included, must be `Clone` and
/// convert into `patchset_core::Value`.
#[proc_macro_derive(Resource, attributes(resource, column))]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    resource::derive(input)
}

/// Derive `patchset_core::Request` for a request shape.
///
/// # Example
///
/// ```rust,ignore
/// use patchset::Request;
///
/// #[derive(Request)]
/// pub struct UserView {
///     #[request(json = "id")]
///     pub id: i64,
///     #[request(json = "name", perm = "Read", substring = "NameTokens")]
///     pub name: String
/// }
/// ```
///
/// See `patchset_core::RequestField` for the meaning of each key.
#[proc_macro_derive(Request, attributes(request))]
pub fn derive_request(input: TokenStream) -> TokenStream {
    request::derive(input)
}
