// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-type resource metadata and the registry that caches it.
//!
//! Metadata is built from a record type's descriptor exactly once per
//! registry and shared read-only afterwards. A process-wide registry backs
//! [`metadata_for`]; applications that prefer explicit initialization can
//! call [`MetadataRegistry::register`] for every record type at startup and
//! pass the registry around instead.
//!
//! # Concurrency
//!
//! Lookups take the read lock. A miss releases it, takes the write lock and
//! checks again before building, so concurrent first use of a type builds
//! its metadata once.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{
        Arc, LazyLock, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering}
    }
};

use tracing::debug;

use crate::{Config, DbType, Field, Resource, ResourceName};

/// Storage column of one field and its declaration position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    /// Position of the field in the record's declaration.
    pub index:  usize,
    /// Storage column name.
    pub column: &'static str
}

/// Column map and configuration of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    resource:              ResourceName,
    field_map:             HashMap<Field, ColumnEntry>,
    fields:                Vec<Field>,
    db_type:               DbType,
    change_tracking_table: String,
    track_changes:         bool
}

impl ResourceMetadata {
    /// Scan a record type's descriptor.
    ///
    /// Fields without a column, or with an empty or `"-"` column, are not
    /// persisted and are left out.
    #[must_use]
    pub fn build<R: Resource>() -> Self {
        let Config {
            db_type,
            change_tracking_table,
            track_changes
        } = R::config();

        let mut field_map = HashMap::new();
        let mut fields = Vec::new();
        for (index, descriptor) in R::fields().iter().enumerate() {
            let Some(column) = descriptor.column else {
                continue;
            };
            if column.is_empty() || column == "-" {
                continue;
            }
            let field = Field::from_static(descriptor.name);
            fields.push(field.clone());
            field_map.insert(
                field,
                ColumnEntry {
                    index,
                    column
                }
            );
        }

        Self {
            resource: R::resource_name(),
            field_map,
            fields,
            db_type,
            change_tracking_table,
            track_changes
        }
    }

    /// Record type name.
    #[must_use]
    pub const fn resource(&self) -> &ResourceName {
        &self.resource
    }

    /// Column entry of a persisted field.
    #[must_use]
    pub fn column(&self, field: &str) -> Option<&ColumnEntry> {
        self.field_map.get(field)
    }

    /// Persisted fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of persisted fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the type has no persisted fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Dialect of the record's table.
    #[must_use]
    pub const fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Audit table name.
    #[must_use]
    pub fn change_tracking_table(&self) -> &str {
        &self.change_tracking_table
    }

    /// Whether mutations write audit records.
    #[must_use]
    pub const fn track_changes(&self) -> bool {
        self.track_changes
    }
}

/// Cache of [`ResourceMetadata`] keyed by record type.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: RwLock<HashMap<TypeId, Arc<ResourceMetadata>>>,
    builds:  AtomicUsize
}

impl MetadataRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for `R`, built on first use.
    pub fn get<R: Resource>(&self) -> Arc<ResourceMetadata> {
        let id = TypeId::of::<R>();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(meta) = entries.get(&id) {
                return Arc::clone(meta);
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(meta) = entries.get(&id) {
            return Arc::clone(meta);
        }

        let meta = Arc::new(ResourceMetadata::build::<R>());
        self.builds.fetch_add(1, Ordering::Relaxed);
        debug!(
            resource = %meta.resource(),
            db_type = %meta.db_type(),
            fields = meta.len(),
            track_changes = meta.track_changes(),
            "built resource metadata"
        );
        entries.insert(id, Arc::clone(&meta));
        meta
    }

    /// Build and cache metadata for `R` ahead of first use.
    ///
    /// Registering a type twice is a no-op.
    pub fn register<R: Resource>(&self) -> &Self {
        self.get::<R>();
        self
    }

    /// Check whether metadata for `R` is cached.
    #[must_use]
    pub fn contains<R: Resource>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<R>())
    }

    /// Number of cached types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check whether no type is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of descriptor scans performed so far.
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

static REGISTRY: LazyLock<MetadataRegistry> = LazyLock::new(MetadataRegistry::new);

/// The process-wide registry.
#[must_use]
pub fn registry() -> &'static MetadataRegistry {
    &REGISTRY
}

/// Metadata for `R` from the process-wide registry.
///
/// # Example
///
/// ```rust,ignore
/// let meta = metadata_for::<User>();
/// assert_eq!(meta.column("name").map(|c| c.column), Some("Name"));
/// ```
pub fn metadata_for<R: Resource>() -> Arc<ResourceMetadata> {
    REGISTRY.get::<R>()
}
