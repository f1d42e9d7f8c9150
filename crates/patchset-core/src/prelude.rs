// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use patchset_core::prelude::*;
//! ```

pub use crate::{
    Collection, Config, DbType, Domain, Enforcer, Error, ErrorKind, Field, FieldSet, KeySet,
    PatchSet, PatchType, Permission, PermissionScope, QueryAccess, QuerySet, ReadTransaction,
    Request, Resource, ResourceName, ResourceSet, Result, SearchKeys, Statement, Transactional,
    User, Value, WriteTransaction, async_trait, check_patch_access, process_event, user_event,
    user_process_event
};
