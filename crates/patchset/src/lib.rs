// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! # patchset
//!
//! One crate, all features. Re-exports:
//! - [`Resource`](macro@Resource) and [`Request`](macro@Request) derive
//!   macros from `patchset-derive-impl`
//! - All types from `patchset-core` ([`PatchSet`], [`QuerySet`],
//!   [`ResourceSet`], [`Collection`], ...)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use patchset::{PatchSet, PatchType, Request, Resource, user_event};
//!
//! #[derive(Debug, Default, Resource)]
//! #[resource(name = "Users", audit_table = "DataChangeEvents", track_changes)]
//! pub struct User {
//!     #[column("Id")]
//!     pub id: i64,
//!     #[column("Name")]
//!     pub name: String
//! }
//!
//! #[derive(Request)]
//! pub struct UserUpdate {
//!     #[request(json = "id")]
//!     pub id: i64,
//!     #[request(json = "name", perm = "Update")]
//!     pub name: String
//! }
//!
//! let mut patch = PatchSet::<User>::new();
//! patch
//!     .set_patch_type(PatchType::Update)
//!     .set_key("id", 7_i64)
//!     .set("name", "jane");
//! patch.apply(&pool, Some(&user_event("admin", "u1"))).await?;
//! ```

pub use patchset_core::*;
pub use patchset_derive_impl::{Request, Resource};
