// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Permission resolution for request shapes.
//!
//! A [`ResourceSet`] pairs a record type with a request shape and resolves,
//! once, which permission gates each request field:
//!
//! ```text
//! perm tag tokens ─┬─ ""          → ignored
//!                  ├─ Delete      → error (delete is resource-level only)
//!                  ├─ Create      → mutating
//!                  ├─ Update      → mutating
//!                  ├─ Immutable   → Update + immutable marker
//!                  └─ anything    → viewing
//! ```
//!
//! A request shape may use at most one viewing permission and may never mix
//! viewing and mutating permissions. Permissions passed to
//! [`ResourceSet::new`] are classified the same way (`Delete` is allowed
//! there) and take part in both rules.

use std::{
    collections::{BTreeSet, HashMap},
    marker::PhantomData,
    sync::Arc
};

use crate::{
    Error, Field, MetadataRegistry, Permission, Request, RequestField, Resource, ResourceMetadata,
    ResourceName, Result, Tag, TagPermissions, metadata::registry
};

/// Resolved permissions of request shape `Q` over record type `R`.
///
/// # Example
///
/// ```rust,ignore
/// let rset = ResourceSet::<User, UserView>::new(&[])?;
/// assert_eq!(rset.permission(), Permission::READ);
/// assert!(rset.permission_required("email", &Permission::READ));
/// assert_eq!(rset.resource("email"), "Users.email");
/// ```
pub struct ResourceSet<R, Q> {
    permissions:       Vec<Permission>,
    required_tag_perm: TagPermissions,
    field_to_tag:      HashMap<Field, Tag>,
    immutable_fields:  BTreeSet<Tag>,
    meta:              Arc<ResourceMetadata>,
    _marker:           PhantomData<fn() -> (R, Q)>
}

impl<R, Q> std::fmt::Debug for ResourceSet<R, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSet")
            .field("resource", self.meta.resource())
            .field("permissions", &self.permissions)
            .field("required_tag_perm", &self.required_tag_perm)
            .field("immutable_fields", &self.immutable_fields)
            .finish()
    }
}

impl<R: Resource, Q: Request> ResourceSet<R, Q> {
    /// Resolve permissions using the process-wide metadata registry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the request shape's permission tags
    /// are inconsistent; see the module documentation.
    pub fn new(permissions: &[Permission]) -> Result<Self> {
        Self::with_registry(registry(), permissions)
    }

    /// Resolve permissions using an explicit metadata registry.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceSet::new`].
    pub fn with_registry(registry: &MetadataRegistry, permissions: &[Permission]) -> Result<Self> {
        let parsed = parse_permissions(Q::request_fields(), permissions)?;
        Ok(Self {
            permissions:       parsed.permissions,
            required_tag_perm: parsed.tags,
            field_to_tag:      parsed.field_to_tag,
            immutable_fields:  parsed.immutable_fields,
            meta:              registry.get::<R>(),
            _marker:           PhantomData
        })
    }

    /// Name of the record type.
    #[must_use]
    pub fn base_resource(&self) -> ResourceName {
        R::resource_name()
    }

    /// Metadata of the record type.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ResourceMetadata> {
        &self.meta
    }
}

impl<R, Q> ResourceSet<R, Q> {
    /// Tags marked `Immutable`.
    #[must_use]
    pub const fn immutable_fields(&self) -> &BTreeSet<Tag> {
        &self.immutable_fields
    }

    /// Check whether the tag of `field` is immutable.
    #[must_use]
    pub fn is_immutable(&self, field: &str) -> bool {
        self.field_to_tag
            .get(field)
            .is_some_and(|tag| self.immutable_fields.contains(tag))
    }

    /// Check whether `field` is gated by `perm`.
    #[must_use]
    pub fn permission_required(&self, field: &str, perm: &Permission) -> bool {
        self.field_to_tag
            .get(field)
            .and_then(|tag| self.required_tag_perm.get(tag))
            .is_some_and(|perms| perms.contains(perm))
    }

    /// The single permission of this request shape, or
    /// [`Permission::NULL`] if there is none.
    ///
    /// # Panics
    ///
    /// Panics if more than one permission was resolved; use
    /// [`ResourceSet::permissions`] for such shapes.
    #[must_use]
    pub fn permission(&self) -> Permission {
        match self.permissions.as_slice() {
            [] => Permission::NULL,
            [single] => single.clone(),
            _ => panic!("resource set has more than one required permission")
        }
    }

    /// Every resolved permission, sorted.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Tag of `field`, if it carries permissions.
    #[must_use]
    pub fn tag(&self, field: &str) -> Option<&Tag> {
        self.field_to_tag.get(field)
    }

    /// Permissions required per tag.
    #[must_use]
    pub const fn tag_permissions(&self) -> &TagPermissions {
        &self.required_tag_perm
    }
}

impl<R: Resource, Q> ResourceSet<R, Q> {
    /// Field-level resource `"{Resource}.{tag}"` of `field`.
    ///
    /// A field without permissions yields `"{Resource}."`.
    #[must_use]
    pub fn resource(&self, field: &str) -> ResourceName {
        let tag = self.field_to_tag.get(field).map_or("", Tag::as_str);
        ResourceName::from(format!("{}.{}", R::resource_name(), tag))
    }
}

#[derive(Debug, Default)]
struct ParsedPermissions {
    tags:             TagPermissions,
    field_to_tag:     HashMap<Field, Tag>,
    permissions:      Vec<Permission>,
    immutable_fields: BTreeSet<Tag>
}

#[derive(Default)]
struct Classes {
    viewing:  BTreeSet<Permission>,
    mutating: BTreeSet<Permission>
}

fn parse_permissions(fields: &[RequestField], required: &[Permission]) -> Result<ParsedPermissions> {
    let mut parsed = ParsedPermissions::default();
    let mut classes = Classes::default();
    let mut all = BTreeSet::new();

    for perm in required {
        if perm.is_empty() {
            continue;
        }
        if perm.is_mutating() {
            classes.mutating.insert(perm.clone());
        } else {
            classes.viewing.insert(perm.clone());
        }
        all.insert(perm.clone());
    }

    for field in fields {
        let json = field.json_name();
        for token in field.perm.unwrap_or_default().split(',') {
            let mut permission = Permission::new(token.trim().to_owned());
            if permission.is_empty() {
                continue;
            }
            if permission == Permission::DELETE {
                return Err(Error::DeletePermissionInTag {
                    field: Field::from_static(field.name)
                });
            }
            if permission == Permission::IMMUTABLE {
                parsed.immutable_fields.insert(Tag::from_static(json));
                permission = Permission::UPDATE;
            }
            if permission.is_mutating() {
                classes.mutating.insert(permission.clone());
            } else {
                classes.viewing.insert(permission.clone());
            }

            if json.is_empty() || json == "-" {
                return Err(Error::PermissionWithoutTag {
                    permission,
                    field: Field::from_static(field.name)
                });
            }

            let tag = Tag::from_static(json);
            parsed
                .tags
                .entry(tag.clone())
                .or_default()
                .push(permission.clone());
            parsed.field_to_tag.insert(Field::from_static(field.name), tag);
            all.insert(permission);
        }
    }

    if classes.viewing.len() > 1 {
        return Err(Error::MultipleViewingPermissions(
            classes.viewing.into_iter().collect()
        ));
    }
    if !classes.viewing.is_empty() && !classes.mutating.is_empty() {
        return Err(Error::MixedPermissions {
            viewing:  classes.viewing.into_iter().collect(),
            mutating: classes.mutating.into_iter().collect()
        });
    }

    parsed.permissions = all.into_iter().collect();
    Ok(parsed)
}
