// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Registry of every resource and permission an application exposes.
//!
//! Handlers register their [`ResourceSet`]s (and any bare resources) at
//! startup; the collection then answers which permissions exist, which
//! resources they apply to and which field-level resources are immutable.
//! Field-level resources are written `"Resource.tag"`.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{PoisonError, RwLock}
};

use crate::{
    Error, Permission, PermissionScope, Resource, ResourceName, ResourceSet, Result, Tag,
    TagPermissions
};

type TagStore = BTreeMap<ResourceName, TagPermissions>;
type ResourceStore = BTreeMap<ResourceName, Vec<Permission>>;
type ImmutableStore = BTreeMap<ResourceName, BTreeSet<Tag>>;

#[derive(Debug, Default)]
struct Stores {
    tags:      BTreeMap<PermissionScope, TagStore>,
    resources: BTreeMap<PermissionScope, ResourceStore>,
    immutable: BTreeMap<PermissionScope, ImmutableStore>
}

/// Thread-safe registry of resources, tag permissions and immutable fields.
///
/// # Example
///
/// ```rust
/// use patchset_core::{Collection, Permission, PermissionScope, ResourceName};
///
/// let collection = Collection::new();
/// collection
///     .add_resource(PermissionScope::Global, Permission::DELETE, ResourceName::from("Users"))
///     .unwrap();
/// assert_eq!(collection.resources(), [ResourceName::from("Users")]);
/// assert_eq!(collection.scope("Users"), Some(PermissionScope::Global));
/// ```
#[derive(Debug, Default)]
pub struct Collection {
    stores: RwLock<Stores>
}

impl Collection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the permissions of a resource set.
    ///
    /// Every resolved permission is registered on the base resource, every
    /// tag permission on its tag, and the immutable tags replace any earlier
    /// ones for the resource.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateResourcePermission`] if a permission is already
    ///   registered on the base resource
    /// - [`Error::DuplicateTagPermission`] if a tag permission is already
    ///   registered
    pub fn add_resources<R: Resource, Q>(&self, scope: PermissionScope, resource_set: &ResourceSet<R, Q>) -> Result<()> {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        let resource = R::resource_name();

        for permission in resource_set.permissions() {
            stores.add_resource(false, scope, permission.clone(), resource.clone())?;
        }

        let tag_store = stores
            .tags
            .entry(scope)
            .or_default()
            .entry(resource.clone())
            .or_default();
        for (tag, permissions) in resource_set.tag_permissions() {
            for permission in permissions {
                let registered = tag_store.entry(tag.clone()).or_default();
                if registered.contains(permission) {
                    return Err(Error::DuplicateTagPermission {
                        resource,
                        tag: tag.clone(),
                        permission: permission.clone()
                    });
                }
                if !permission.is_empty() {
                    registered.push(permission.clone());
                }
            }
        }

        stores
            .immutable
            .entry(scope)
            .or_default()
            .insert(resource, resource_set.immutable_fields().clone());
        Ok(())
    }

    /// Register a single permission on a resource.
    ///
    /// Registering the same pair twice is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullPermission`] for the empty permission.
    pub fn add_resource(&self, scope: PermissionScope, permission: Permission, resource: ResourceName) -> Result<()> {
        if permission.is_empty() {
            return Err(Error::NullPermission);
        }
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_resource(true, scope, permission, resource)
    }

    /// Check whether the field-level resource `"Resource.tag"` is immutable.
    ///
    /// # Panics
    ///
    /// Panics if `resource` contains more than one `.`.
    #[must_use]
    pub fn is_resource_immutable(&self, scope: PermissionScope, resource: &ResourceName) -> bool {
        let (base, tag) = resource.resource_and_tag();
        self.read()
            .immutable
            .get(&scope)
            .and_then(|store| store.get(&base))
            .is_some_and(|tags| tags.contains(&tag))
    }

    /// Every registered permission, sorted and deduplicated.
    #[must_use]
    pub fn permissions(&self) -> Vec<Permission> {
        let stores = self.read();
        let resource_perms = stores.resources.values().flat_map(BTreeMap::values).flatten();
        let tag_perms = stores
            .tags
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .flatten();
        resource_perms
            .chain(tag_perms)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every resource with a resource-level permission, sorted and
    /// deduplicated.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceName> {
        self.read()
            .resources
            .values()
            .flat_map(BTreeMap::keys)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Registered tags per resource, sorted.
    #[must_use]
    pub fn tags(&self) -> BTreeMap<ResourceName, Vec<Tag>> {
        let mut out: BTreeMap<ResourceName, Vec<Tag>> = BTreeMap::new();
        for store in self.read().tags.values() {
            for (resource, tags) in store {
                out.entry(resource.clone()).or_default().extend(tags.keys().cloned());
            }
        }
        for tags in out.values_mut() {
            tags.sort();
        }
        out
    }

    /// For every resource and field-level resource, every known permission
    /// mapped to whether it is registered there.
    #[must_use]
    pub fn resource_permissions(&self) -> BTreeMap<ResourceName, BTreeMap<Permission, bool>> {
        let stores = self.read();
        let mut out: BTreeMap<ResourceName, BTreeMap<Permission, bool>> = BTreeMap::new();
        let mut known = BTreeSet::new();

        let mut require = |resource: ResourceName, permissions: &[Permission]| {
            let entry = out.entry(resource).or_default();
            for permission in permissions {
                known.insert(permission.clone());
                entry.insert(permission.clone(), true);
            }
        };

        for store in stores.resources.values() {
            for (resource, permissions) in store {
                require(resource.clone(), permissions);
            }
        }
        for store in stores.tags.values() {
            for (resource, tags) in store {
                for (tag, permissions) in tags {
                    require(resource.with_tag(tag), permissions);
                }
            }
        }

        for permissions in out.values_mut() {
            for permission in &known {
                permissions.entry(permission.clone()).or_insert(false);
            }
        }
        out
    }

    /// Resources and field-level resources per permission.
    #[must_use]
    pub fn list(&self) -> BTreeMap<Permission, Vec<ResourceName>> {
        let stores = self.read();
        let mut out: BTreeMap<Permission, Vec<ResourceName>> = BTreeMap::new();
        for store in stores.resources.values() {
            for (resource, permissions) in store {
                for permission in permissions {
                    out.entry(permission.clone()).or_default().push(resource.clone());
                }
            }
        }
        for store in stores.tags.values() {
            for (resource, tags) in store {
                for (tag, permissions) in tags {
                    for permission in permissions {
                        out.entry(permission.clone()).or_default().push(resource.with_tag(tag));
                    }
                }
            }
        }
        out
    }

    /// Scope a resource or field-level resource is registered under.
    ///
    /// # Panics
    ///
    /// Panics if `resource` contains more than one `.`.
    #[must_use]
    pub fn scope(&self, resource: impl Into<ResourceName>) -> Option<PermissionScope> {
        let resource = resource.into();
        let stores = self.read();
        if let Some((scope, _)) = stores
            .resources
            .iter()
            .find(|(_, store)| store.contains_key(&resource))
        {
            return Some(*scope);
        }

        let (base, tag) = resource.resource_and_tag();
        stores
            .tags
            .iter()
            .find(|(_, store)| store.get(&base).is_some_and(|tags| tags.contains_key(&tag)))
            .map(|(scope, _)| *scope)
    }

    /// Scopes with at least one resource-level permission.
    #[must_use]
    pub fn scopes(&self) -> Vec<PermissionScope> {
        self.read().resources.keys().copied().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Stores> {
        self.stores.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Stores {
    fn add_resource(
        &mut self,
        allow_duplicate: bool,
        scope: PermissionScope,
        permission: Permission,
        resource: ResourceName
    ) -> Result<()> {
        let registered = self
            .resources
            .entry(scope)
            .or_default()
            .entry(resource.clone())
            .or_default();
        if !allow_duplicate && registered.contains(&permission) {
            return Err(Error::DuplicateResourcePermission {
                resource,
                permission
            });
        }
        registered.push(permission);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, DbType, FieldDescriptor, MetadataRegistry, Request, RequestField, Value};

    #[derive(Debug, Default)]
    struct Users;

    impl Resource for Users {
        fn resource_name() -> ResourceName {
            ResourceName::from_static("Users")
        }

        fn default_config() -> Config {
            Config::new(DbType::Spanner)
        }

        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[
                FieldDescriptor::new("id", Some("Id")),
                FieldDescriptor::new("name", Some("Name"))
            ];
            FIELDS
        }

        fn field_value(&self, _field: &str) -> Option<Value> {
            None
        }
    }

    struct UserCreate;

    impl Request for UserCreate {
        fn request_fields() -> &'static [RequestField] {
            const FIELDS: &[RequestField] = &[
                RequestField::new("id").json("id").perm("Immutable"),
                RequestField::new("name").json("name").perm("Create,Update")
            ];
            FIELDS
        }
    }

    fn resource_set() -> ResourceSet<Users, UserCreate> {
        ResourceSet::with_registry(&MetadataRegistry::new(), &[Permission::CREATE]).unwrap()
    }

    fn users(tag: &str) -> ResourceName {
        ResourceName::from(format!("Users.{tag}"))
    }

    #[test]
    fn registers_resource_set() {
        let collection = Collection::new();
        collection
            .add_resources(PermissionScope::Domain, &resource_set())
            .unwrap();

        assert_eq!(collection.resources(), [ResourceName::from("Users")]);
        assert_eq!(collection.permissions(), [Permission::CREATE, Permission::UPDATE]);
        assert_eq!(collection.tags()[&ResourceName::from("Users")], [Tag::from("id"), Tag::from("name")]);
        assert!(collection.is_resource_immutable(PermissionScope::Domain, &users("id")));
        assert!(!collection.is_resource_immutable(PermissionScope::Domain, &users("name")));
        assert!(!collection.is_resource_immutable(PermissionScope::Global, &users("id")));
        assert_eq!(collection.scope(users("name")), Some(PermissionScope::Domain));
        assert_eq!(collection.scope("Groups"), None);
        assert_eq!(collection.scopes(), [PermissionScope::Domain]);
    }

    #[test]
    fn duplicate_resource_set_is_rejected() {
        let collection = Collection::new();
        let rset = resource_set();
        collection.add_resources(PermissionScope::Global, &rset).unwrap();
        assert!(matches!(
            collection.add_resources(PermissionScope::Global, &rset),
            Err(Error::DuplicateResourcePermission { .. })
        ));
    }

    #[test]
    fn add_resource_rules() {
        let collection = Collection::new();
        let users = ResourceName::from("Users");
        assert!(matches!(
            collection.add_resource(PermissionScope::Global, Permission::NULL, users.clone()),
            Err(Error::NullPermission)
        ));
        collection
            .add_resource(PermissionScope::Global, Permission::DELETE, users.clone())
            .unwrap();
        collection
            .add_resource(PermissionScope::Global, Permission::DELETE, users)
            .unwrap();
        assert_eq!(collection.permissions(), [Permission::DELETE]);
    }

    #[test]
    fn permission_maps() {
        let collection = Collection::new();
        collection
            .add_resources(PermissionScope::Global, &resource_set())
            .unwrap();
        collection
            .add_resource(PermissionScope::Global, Permission::DELETE, ResourceName::from("Users"))
            .unwrap();

        let map = collection.resource_permissions();
        assert_eq!(map.len(), 3);
        let id = &map[&users("id")];
        assert_eq!(id[&Permission::UPDATE], true);
        assert_eq!(id[&Permission::CREATE], false);
        assert_eq!(id[&Permission::DELETE], false);
        assert_eq!(map[&ResourceName::from("Users")][&Permission::DELETE], true);

        let list = collection.list();
        assert_eq!(list[&Permission::CREATE], [ResourceName::from("Users"), users("name")]);
        assert_eq!(list[&Permission::UPDATE].len(), 3);
    }
}
