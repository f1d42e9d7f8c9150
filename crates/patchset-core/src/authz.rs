// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Field-level access resolution against an authorization oracle.
//!
//! The oracle itself is opaque: anything implementing [`Enforcer`] can
//! answer whether a user holds a permission on a set of resources within a
//! domain. This module decides which resources to ask about.
//!
//! Reads go through [`QueryAccess`], which narrows a request shape down to
//! the fields the user may see. Writes go through [`check_patch_access`],
//! which rejects the patch unless every staged field is writable.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    Domain, Error, Field, FieldMapper, PatchSet, PatchType, Permission, QuerySet, Request,
    Resource, ResourceName, ResourceSet, Result, User
};

/// Authorization oracle.
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// Check that `user` holds `permission` on every one of `resources` in
    /// `domain`.
    ///
    /// Returns whether access is granted and the resources that were
    /// missing.
    ///
    /// # Errors
    ///
    /// Implementations report backend failures as
    /// [`Error::Enforcer`](crate::Error::Enforcer).
    async fn require_resources(
        &self,
        user: &User,
        domain: &Domain,
        permission: &Permission,
        resources: &[ResourceName]
    ) -> Result<(bool, Vec<ResourceName>)>;
}

/// Resolves the viewable fields of request shape `Q` over record type `R`.
///
/// # Example
///
/// ```rust,ignore
/// let access = QueryAccess::new(ResourceSet::<User, UserView>::new(&[])?)?;
/// let query = access.query_set(&enforcer, &user, &domain, Some("id,email")).await?;
/// ```
#[derive(Debug)]
pub struct QueryAccess<R, Q> {
    mapper:       FieldMapper,
    resource_set: ResourceSet<R, Q>
}

impl<R: Resource, Q: Request> QueryAccess<R, Q> {
    /// Build access resolution for a resolved resource set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTag`] if two fields of `Q` share a JSON
    /// name.
    pub fn new(resource_set: ResourceSet<R, Q>) -> Result<Self> {
        Ok(Self {
            mapper: FieldMapper::new::<Q>()?,
            resource_set
        })
    }

    /// Resource set the access is resolved against.
    #[must_use]
    pub const fn resource_set(&self) -> &ResourceSet<R, Q> {
        &self.resource_set
    }

    /// Fields of `Q` that `user` may view, in declaration order.
    ///
    /// `columns` is an optional comma-separated list of JSON names that
    /// narrows the result.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownColumn`] if `columns` names an unknown field
    /// - [`Error::Forbidden`] if the user lacks the permission on the record
    ///   type or on every selected field
    /// - [`Error::Enforcer`] from the oracle
    pub async fn fields<E>(
        &self,
        enforcer: &E,
        user: &User,
        domain: &Domain,
        columns: Option<&str>
    ) -> Result<Vec<Field>>
    where
        E: Enforcer + ?Sized
    {
        let selected = self.selected_columns(columns)?;
        let permission = self.resource_set.permission();
        let base = self.resource_set.base_resource();

        let (granted, _) = enforcer
            .require_resources(user, domain, &permission, std::slice::from_ref(&base))
            .await?;
        if !granted {
            return Err(Error::Forbidden(format!(
                "user {user} does not have {permission} permission on {base}"
            )));
        }

        let mut fields = Vec::with_capacity(self.mapper.fields().len());
        for field in self.mapper.fields() {
            if !selected.is_empty() && !selected.contains(field) {
                continue;
            }

            if !self.resource_set.permission_required(field.as_str(), &permission) {
                fields.push(field.clone());
                continue;
            }

            let resource = self.resource_set.resource(field.as_str());
            let (granted, _) = enforcer
                .require_resources(user, domain, &permission, std::slice::from_ref(&resource))
                .await?;
            if granted {
                fields.push(field.clone());
            } else {
                debug!(%user, %resource, %permission, "field hidden");
            }
        }

        if fields.is_empty() {
            return Err(Error::Forbidden(format!(
                "user {user} does not have {permission} permission on any fields in {base}"
            )));
        }
        Ok(fields)
    }

    /// A [`QuerySet`] projecting the fields `user` may view.
    ///
    /// # Errors
    ///
    /// Same as [`fields`](Self::fields).
    pub async fn query_set<E>(
        &self,
        enforcer: &E,
        user: &User,
        domain: &Domain,
        columns: Option<&str>
    ) -> Result<QuerySet<R>>
    where
        E: Enforcer + ?Sized
    {
        let fields = self.fields(enforcer, user, domain, columns).await?;
        let mut query = QuerySet::with_metadata(self.resource_set.metadata().clone());
        for field in fields {
            query.add_field(field);
        }
        Ok(query)
    }

    fn selected_columns(&self, columns: Option<&str>) -> Result<Vec<Field>> {
        let Some(columns) = columns.filter(|c| !c.is_empty()) else {
            return Ok(Vec::new());
        };
        columns
            .split(',')
            .map(|column| {
                self.mapper
                    .field(column)
                    .cloned()
                    .ok_or_else(|| Error::UnknownColumn(column.to_owned()))
            })
            .collect()
    }
}

/// Check that `user` may apply `patch` with `permission`.
///
/// Requires the permission on the record type, and on the field-level
/// resource of every staged field that the permission gates. Updates may not
/// touch immutable fields.
///
/// # Errors
///
/// - [`Error::ImmutableField`] if an update stages an immutable field
/// - [`Error::Forbidden`] naming the missing resources
/// - [`Error::Enforcer`] from the oracle
pub async fn check_patch_access<R, Q, E>(
    enforcer: &E,
    resource_set: &ResourceSet<R, Q>,
    patch: &PatchSet<R>,
    user: &User,
    domain: &Domain,
    permission: &Permission
) -> Result<()>
where
    R: Resource,
    E: Enforcer + ?Sized
{
    if patch.patch_type() == Some(PatchType::Update) {
        if let Some(field) = patch.fields().iter().find(|f| resource_set.is_immutable(f.as_str())) {
            return Err(Error::ImmutableField {
                field:    field.clone(),
                resource: patch.resource()
            });
        }
    }

    let mut resources = vec![patch.resource()];
    resources.extend(
        patch
            .fields()
            .iter()
            .filter(|field| resource_set.permission_required(field.as_str(), permission))
            .map(|field| resource_set.resource(field.as_str()))
    );

    let (granted, missing) = enforcer
        .require_resources(user, domain, permission, &resources)
        .await?;
    if granted {
        return Ok(());
    }

    let missing = if missing.is_empty() { resources } else { missing };
    let names: Vec<&str> = missing.iter().map(ResourceName::as_str).collect();
    Err(Error::Forbidden(format!(
        "user {user} does not have {permission} permission on {}",
        names.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use super::*;
    use crate::{Config, DbType, FieldDescriptor, MetadataRegistry, RequestField, Value};

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
                FieldDescriptor::new("name", Some("Name")),
                FieldDescriptor::new("ssn", Some("Ssn"))
            ];
            FIELDS
        }

        fn field_value(&self, _field: &str) -> Option<Value> {
            None
        }
    }

    struct UserView;

    impl Request for UserView {
        fn request_fields() -> &'static [RequestField] {
            const FIELDS: &[RequestField] = &[
                RequestField::new("id").json("id"),
                RequestField::new("name").json("name"),
                RequestField::new("ssn").json("ssn").perm("Read")
            ];
            FIELDS
        }
    }

    struct UserPatch;

    impl Request for UserPatch {
        fn request_fields() -> &'static [RequestField] {
            const FIELDS: &[RequestField] = &[
                RequestField::new("name").json("name").perm("Create,Update"),
                RequestField::new("ssn").json("ssn").perm("Immutable")
            ];
            FIELDS
        }
    }

    /// Grants everything in `allowed` and records every question asked.
    #[derive(Default)]
    struct Grants {
        allowed: HashSet<&'static str>,
        asked:   Mutex<Vec<String>>
    }

    impl Grants {
        fn allowing(allowed: &[&'static str]) -> Self {
            Self {
                allowed: allowed.iter().copied().collect(),
                asked:   Mutex::default()
            }
        }
    }

    #[async_trait]
    impl Enforcer for Grants {
        async fn require_resources(
            &self,
            _user: &User,
            _domain: &Domain,
            permission: &Permission,
            resources: &[ResourceName]
        ) -> Result<(bool, Vec<ResourceName>)> {
            let mut asked = self.asked.lock().unwrap();
            let missing: Vec<ResourceName> = resources
                .iter()
                .filter(|r| {
                    asked.push(format!("{permission}:{r}"));
                    !self.allowed.contains(r.as_str())
                })
                .cloned()
                .collect();
            Ok((missing.is_empty(), missing))
        }
    }

    fn view_access() -> QueryAccess<Users, UserView> {
        let registry = MetadataRegistry::new();
        QueryAccess::new(ResourceSet::with_registry(&registry, &[]).unwrap()).unwrap()
    }

    fn user() -> (User, Domain) {
        (User::from("jane"), Domain::from("global"))
    }

    #[tokio::test]
    async fn hides_gated_fields_without_grant() {
        let (user, domain) = user();
        let grants = Grants::allowing(&["Users"]);
        let fields = view_access().fields(&grants, &user, &domain, None).await.unwrap();
        assert_eq!(fields, [Field::from("id"), Field::from("name")]);
        assert_eq!(grants.asked.lock().unwrap().as_slice(), ["Read:Users", "Read:Users.ssn"]);
    }

    #[tokio::test]
    async fn shows_gated_fields_with_grant() {
        let (user, domain) = user();
        let grants = Grants::allowing(&["Users", "Users.ssn"]);
        let fields = view_access().fields(&grants, &user, &domain, None).await.unwrap();
        assert_eq!(fields.len(), 3);
    }

    #[tokio::test]
    async fn columns_narrow_and_validate() {
        let (user, domain) = user();
        let grants = Grants::allowing(&["Users"]);
        let access = view_access();

        let query = access.query_set(&grants, &user, &domain, Some("name")).await.unwrap();
        assert_eq!(query.fields(), [Field::from("name")]);

        let err = access.fields(&grants, &user, &domain, Some("nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "unknown column: nope");

        let err = access.fields(&grants, &user, &domain, Some("ssn")).await.unwrap_err();
        assert_eq!(err.to_string(), "user jane does not have Read permission on any fields in Users");
    }

    #[tokio::test]
    async fn base_resource_denied() {
        let (user, domain) = user();
        let err = view_access()
            .fields(&Grants::default(), &user, &domain, None)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert_eq!(err.to_string(), "user jane does not have Read permission on Users");
    }

    #[tokio::test]
    async fn patch_access() {
        let (user, domain) = user();
        let registry = MetadataRegistry::new();
        let rset = ResourceSet::<Users, UserPatch>::with_registry(&registry, &[]).unwrap();

        let mut patch = PatchSet::<Users>::with_metadata(registry.get::<Users>());
        patch.set_patch_type(PatchType::Create).set_key("id", 1_i64).set("name", "x").set("ssn", "1");

        let grants = Grants::allowing(&["Users", "Users.name"]);
        check_patch_access(&grants, &rset, &patch, &user, &domain, &Permission::CREATE)
            .await
            .unwrap();

        let grants = Grants::allowing(&["Users"]);
        let err = check_patch_access(&grants, &rset, &patch, &user, &domain, &Permission::CREATE)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "user jane does not have Create permission on Users.name");

        patch.set_patch_type(PatchType::Update);
        let err = check_patch_access(&grants, &rset, &patch, &user, &domain, &Permission::UPDATE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImmutableField { .. }));
    }
}
