// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Runtime for permission-checked patches, queries and audited change sets.
//!
//! This crate provides the types and traits used by `patchset` derived code.
//! It can also be used standalone with hand-written [`Resource`] and
//! [`Request`] implementations.
//!
//! # Overview
//!
//! - [`FieldSet`] / [`KeySet`]: staged field values and primary-key values
//! - [`ResourceMetadata`] / [`MetadataRegistry`]: cached per-type schema
//! - [`ResourceSet`]: permissions resolved from a request shape's tags
//! - [`QuerySet`]: SQL for key lookups and Spanner text search
//! - [`PatchSet`]: buffered create / update / delete with audit records
//! - [`diff`]: value matching and change sets
//! - [`QueryAccess`] / [`check_patch_access`]: enforcement against an
//!   [`Enforcer`]
//! - [`Collection`]: registry of every resource and permission
//! - [`prelude`]: convenient re-exports
//!
//! # Storage
//!
//! Queries and patches run through [`ReadTransaction`] and
//! [`WriteTransaction`]. With the `postgres` feature those are implemented
//! for `sqlx::Transaction<'static, Postgres>`, and `PgPool` implements
//! [`Transactional`] so [`PatchSet::apply`] can run in its own transaction.
//!
//! # Usage
//!
//! ```rust,ignore
//! use patchset_core::prelude::*;
//!
//! let mut patch = PatchSet::<User>::new();
//! patch.set_patch_type(PatchType::Update);
//! patch.set_key("id", Value::from(7_i64));
//! patch.set("name", Value::from("jane"));
//! patch.apply(&pool, Some(&user_event("jane", "u7"))).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod access;
pub mod audit;
pub mod authz;
pub mod collection;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod field_mapper;
pub mod fieldset;
pub mod keyset;
pub mod metadata;
pub mod patch_set;
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres;
pub mod prelude;
pub mod query_set;
pub mod resource_set;
pub mod schema;
pub mod search;
pub mod statement;
pub mod value;

pub use access::{Domain, Field, Permission, PermissionScope, ResourceName, Tag, TagPermissions, User};
/// Re-export async_trait for implementors of the storage and enforcer traits.
pub use async_trait::async_trait;
pub use audit::{DataChangeEvent, process_event, user_event, user_process_event};
pub use authz::{Enforcer, QueryAccess, check_patch_access};
pub use collection::Collection;
pub use config::{Config, DbType, UnknownDbType};
pub use db::{
    Mutation, MutationValue, ReadTransaction, Row, TransactionError, TransactionOps, Transactional,
    WriteTransaction
};
pub use diff::{ChangeSet, DiffElem};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use field_mapper::FieldMapper;
pub use fieldset::FieldSet;
pub use keyset::{Key, KeyPart, KeySet};
pub use metadata::{ColumnEntry, MetadataRegistry, ResourceMetadata};
pub use patch_set::{PatchSet, PatchType};
pub use query_set::QuerySet;
pub use resource_set::ResourceSet;
pub use schema::{FieldDescriptor, Request, RequestField, Resource, SearchTag};
pub use search::{SearchKey, SearchKeys, SearchSet, SearchType};
pub use statement::Statement;
pub use value::{Scalar, ScalarKind, Shape, Text, TextKind, Value};
