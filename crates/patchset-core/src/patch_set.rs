// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Staged mutations of one record.
//!
//! A [`PatchSet`] holds the staged field values, the primary key and the
//! [`PatchType`]. Buffering it writes one data mutation and, when change
//! tracking is enabled for the record type, one audit record into the same
//! transaction.
//!
//! # Change sets
//!
//! | Patch | Baseline | Recorded |
//! |-------|----------|----------|
//! | Create | zero-valued record | non-zero staged values as `New` |
//! | Update | stored row | changed staged fields as `Old`/`New` |
//! | Delete | stored row | non-zero stored values as `Old` |
//! | Insert-or-update | stored row, else zero-valued record | as update, else as create |
//!
//! Update and delete read the stored row first; a missing row fails with
//! [`Error::NotFound`] and an update that changes nothing fails with
//! [`Error::NoChanges`]. Change sets are computed before anything is
//! buffered, so a failed patch leaves the transaction untouched.
//!
//! # Lifecycle
//!
//! A patch set is staged, then buffered or applied once. Buffering it again
//! writes the same mutations again.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    ChangeSet, DataChangeEvent, Error, Field, FieldSet, KeySet, Mutation, Resource,
    ResourceMetadata, ResourceName, Result, Row, Transactional, TransactionError, TransactionOps,
    Value, WriteTransaction,
    diff::{create_change_set, delete_change_set, diff},
    metadata::metadata_for,
    query_set::QuerySet
};

/// Kind of mutation a [`PatchSet`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchType {
    /// Insert a new row.
    Create,
    /// Update an existing row.
    Update,
    /// Delete an existing row.
    Delete
}

impl PatchType {
    /// Lowercase name of the patch type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete"
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staged field values, key and patch type for one record of type `R`.
///
/// # Example
///
/// ```rust,ignore
/// let mut patch = PatchSet::<Account>::new();
/// patch
///     .set_patch_type(PatchType::Update)
///     .set_key("id", 42_i64)
///     .set("name", "renamed");
///
/// patch.apply(&pool, Some(&user_event("jane", "u1"))).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PatchSet<R> {
    query:      QuerySet<R>,
    data:       FieldSet,
    patch_type: Option<PatchType>
}

impl<R: Resource> Default for PatchSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> PatchSet<R> {
    /// Create an empty patch using metadata from the process-wide registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metadata(metadata_for::<R>())
    }

    /// Create an empty patch using explicitly supplied metadata.
    #[must_use]
    pub fn with_metadata(meta: Arc<ResourceMetadata>) -> Self {
        Self {
            query:      QuerySet::with_metadata(meta),
            data:       FieldSet::new(),
            patch_type: None
        }
    }

    /// Record type name, also the table name.
    #[must_use]
    pub fn resource(&self) -> ResourceName {
        R::resource_name()
    }

    /// Set the patch type.
    pub fn set_patch_type(&mut self, patch_type: PatchType) -> &mut Self {
        self.patch_type = Some(patch_type);
        self
    }

    /// Patch type, if set.
    #[must_use]
    pub const fn patch_type(&self) -> Option<PatchType> {
        self.patch_type
    }

    /// Stage a field value.
    pub fn set(&mut self, field: impl Into<Field>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        self.query.add_field(field.clone());
        self.data.set(field, value);
        self
    }

    /// Staged value of `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Check whether `field` is staged.
    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.data.is_set(field)
    }

    /// Add a primary key component.
    pub fn set_key(&mut self, field: impl Into<Field>, value: impl Into<Value>) -> &mut Self {
        self.query.set_key(field, value);
        self
    }

    /// Value of a primary key component.
    #[must_use]
    pub fn key(&self, field: &str) -> Option<&Value> {
        self.query.key(field)
    }

    /// Staged fields in staging order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        self.query.fields()
    }

    /// Number of staged fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether no field is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Staged values.
    #[must_use]
    pub const fn data(&self) -> &FieldSet {
        &self.data
    }

    /// Primary key in the order it was set.
    #[must_use]
    pub fn primary_key(&self) -> KeySet {
        self.query.key_set()
    }

    /// Check whether at least one key component is set.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.primary_key().is_empty()
    }

    /// Staged values and key as a row of storage columns.
    ///
    /// Staged fields come first in staging order, then key fields that were
    /// not staged. A key value wins over a staged value for the same field.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingKey`] if no key component is set
    /// - [`Error::UnknownField`] if a field has no column
    pub fn resolve(&self) -> Result<Row> {
        let key_set = self.primary_key();
        if key_set.is_empty() {
            return Err(Error::MissingKey);
        }

        let mut row = Row::new();
        for (field, value) in self.data.iter() {
            let value = self.key(field.as_str()).unwrap_or(value);
            row.push(self.column(field)?, value.clone());
        }
        for part in key_set.parts() {
            if !self.data.is_set(part.key.as_str()) {
                row.push(self.column(&part.key)?, part.value.clone());
            }
        }
        Ok(row)
    }

    /// Staged fields whose value differs from `old`.
    ///
    /// # Errors
    ///
    /// See [`diff`](crate::diff::diff).
    pub fn diff(&self, old: &R) -> Result<ChangeSet> {
        diff(old, &self.data)
    }

    /// Compare two patches by type, staged data, staged fields and key.
    ///
    /// For creates only the key field names are compared, since key values
    /// are often generated.
    #[must_use]
    pub fn same_patch(&self, other: &Self) -> bool {
        if self.patch_type != other.patch_type || self.fields() != other.fields() {
            return false;
        }

        let same_data = self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .all(|(field, value)| other.data.get(field.as_str()) == Some(value));
        if !same_data {
            return false;
        }

        let (a, b) = (self.primary_key(), other.primary_key());
        if self.patch_type == Some(PatchType::Create) {
            a.keys().eq(b.keys())
        } else {
            a == b
        }
    }

    /// Buffer the patch into a caller-owned transaction.
    ///
    /// `event_source` is required when change tracking is enabled.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPatchType`] if no patch type is set
    /// - [`Error::MissingEventSource`] if change tracking needs one
    /// - [`Error::MissingKey`] and [`Error::UnknownField`] from
    ///   [`resolve`](Self::resolve)
    /// - [`Error::NotFound`] if an update or delete finds no stored row
    /// - [`Error::NoChanges`] if an update changes nothing
    /// - any database error
    pub async fn buffer<T>(&self, txn: &mut T, event_source: Option<&str>) -> Result<()>
    where
        T: WriteTransaction<R> + ?Sized
    {
        let patch_type = self
            .patch_type
            .ok_or_else(|| Error::MissingPatchType(self.resource()))?;
        let event_source = self.validate_event_source(event_source)?;
        let table = self.resource().to_string();

        let mut mutations = vec![match patch_type {
            PatchType::Create => Mutation::Insert {
                table,
                row: self.resolve()?
            },
            PatchType::Update => Mutation::Update {
                table,
                row:         self.resolve()?,
                key_columns: self.key_columns()?
            },
            PatchType::Delete => Mutation::Delete {
                table,
                key_columns: self.key_columns()?,
                key:         self.primary_key().key()
            }
        }];

        if self.meta().track_changes() {
            let change_set = match patch_type {
                PatchType::Create => create_change_set::<R>(&self.data)?,
                PatchType::Update => self.update_change_set(txn).await?,
                PatchType::Delete => self.removed_change_set(txn).await?
            };
            mutations.push(
                self.event(event_source, change_set)
                    .insert(self.meta().change_tracking_table())?
            );
        }

        self.write(txn, patch_type.as_str(), mutations).await
    }

    /// Buffer the patch as an insert-or-update into a caller-owned
    /// transaction, ignoring the patch type.
    ///
    /// With change tracking enabled, the change set is computed against the
    /// stored row if there is one and against the zero-valued record
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`buffer`](Self::buffer), except that a missing row is not an
    /// error.
    pub async fn buffer_insert_or_update<T>(&self, txn: &mut T, event_source: Option<&str>) -> Result<()>
    where
        T: WriteTransaction<R> + ?Sized
    {
        let event_source = self.validate_event_source(event_source)?;
        let mut mutations = vec![Mutation::InsertOrUpdate {
            table:       self.resource().to_string(),
            row:         self.resolve()?,
            key_columns: self.key_columns()?
        }];

        if self.meta().track_changes() {
            let change_set = match self.update_change_set(txn).await {
                Ok(change_set) => change_set,
                Err(err) if err.is_not_found() => create_change_set::<R>(&self.data)?,
                Err(err) => return Err(err)
            };
            mutations.push(
                self.event(event_source, change_set)
                    .insert_or_update(self.meta().change_tracking_table())?
            );
        }

        self.write(txn, "insert_or_update", mutations).await
    }

    /// Apply the patch in a transaction of its own.
    ///
    /// The transaction commits if buffering succeeds and rolls back
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`buffer`](Self::buffer), plus [`Error::Database`] wrapping a
    /// [`TransactionError`] if the transaction cannot begin or commit.
    pub async fn apply<P>(&self, db: &P, event_source: Option<&str>) -> Result<()>
    where
        P: Transactional,
        P::Transaction: WriteTransaction<R>
    {
        self.in_transaction(db, false, event_source).await
    }

    /// Apply the patch as an insert-or-update in a transaction of its own.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub async fn insert_or_update<P>(&self, db: &P, event_source: Option<&str>) -> Result<()>
    where
        P: Transactional,
        P::Transaction: WriteTransaction<R>
    {
        self.in_transaction(db, true, event_source).await
    }

    async fn in_transaction<P>(&self, db: &P, upsert: bool, event_source: Option<&str>) -> Result<()>
    where
        P: Transactional,
        P::Transaction: WriteTransaction<R>
    {
        let mut txn = db
            .begin()
            .await
            .map_err(|e| Error::database(TransactionError::Begin(e)))?;

        let result = if upsert {
            self.buffer_insert_or_update(&mut txn, event_source).await
        } else {
            self.buffer(&mut txn, event_source).await
        };

        match result {
            Ok(()) => txn
                .commit()
                .await
                .map_err(|e| Error::database(TransactionError::Commit(e))),
            Err(err) => {
                warn!(resource = %self.resource(), error = %err, "patch failed, rolling back");
                if let Err(rollback) = txn.rollback().await {
                    warn!(resource = %self.resource(), error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn update_change_set<T>(&self, txn: &mut T) -> Result<ChangeSet>
    where
        T: WriteTransaction<R> + ?Sized
    {
        let old = self.read_stored(txn).await?;
        let change_set = self.diff(&old)?;
        if change_set.is_empty() {
            return Err(Error::NoChanges {
                resource: self.resource(),
                key:      self.primary_key().to_string()
            });
        }
        Ok(change_set)
    }

    async fn removed_change_set<T>(&self, txn: &mut T) -> Result<ChangeSet>
    where
        T: WriteTransaction<R> + ?Sized
    {
        let old = self.read_stored(txn).await?;
        Ok(delete_change_set(&old, self.meta().fields()))
    }

    async fn read_stored<T>(&self, txn: &mut T) -> Result<R>
    where
        T: WriteTransaction<R> + ?Sized
    {
        let mut query = QuerySet::<R>::with_metadata(Arc::clone(self.meta()));
        for field in self.meta().fields() {
            query.add_field(field.clone());
        }
        for part in self.primary_key().parts() {
            query.set_key(part.key.clone(), part.value.clone());
        }
        query.read(txn).await
    }

    async fn write<T>(&self, txn: &mut T, operation: &str, mutations: Vec<Mutation>) -> Result<()>
    where
        T: WriteTransaction<R> + ?Sized
    {
        let count = mutations.len();
        txn.buffer_write(mutations).await?;
        debug!(
            resource = %self.resource(),
            operation,
            row_id = %self.primary_key().row_id(),
            mutations = count,
            "buffered patch"
        );
        Ok(())
    }

    fn event(&self, event_source: String, change_set: ChangeSet) -> DataChangeEvent {
        DataChangeEvent {
            table_name: self.resource(),
            row_id: self.primary_key().row_id(),
            event_source,
            change_set
        }
    }

    fn validate_event_source(&self, event_source: Option<&str>) -> Result<String> {
        match event_source {
            Some(source) => Ok(source.to_owned()),
            None if self.meta().track_changes() => Err(Error::MissingEventSource(self.resource())),
            None => Ok(String::new())
        }
    }

    fn key_columns(&self) -> Result<Vec<String>> {
        let key_set = self.primary_key();
        if key_set.is_empty() {
            return Err(Error::MissingKey);
        }
        key_set.keys().map(|field| self.column(field)).collect()
    }

    fn column(&self, field: &Field) -> Result<String> {
        self.meta()
            .column(field.as_str())
            .map(|entry| entry.column.to_owned())
            .ok_or_else(|| Error::UnknownField {
                field:    field.clone(),
                resource: self.resource()
            })
    }

    fn meta(&self) -> &Arc<ResourceMetadata> {
        self.query.metadata()
    }
}
