// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Database client boundary.
//!
//! The crate renders statements and mutations; a database adapter executes
//! them. Adapters implement:
//!
//! - [`ReadTransaction`]: run a rendered statement and scan rows into a
//!   record, reporting "no row" as `Ok(None)`
//! - [`WriteTransaction`]: additionally accept buffered [`Mutation`]s
//! - [`Transactional`] / [`TransactionOps`]: open, commit and roll back a
//!   transaction for [`PatchSet::apply`](crate::PatchSet::apply)
//!
//! Mutations buffered into one write transaction commit atomically. The
//! crate never retries; cancellation and deadlines belong to the adapter.

use std::error::Error as StdError;

use async_trait::async_trait;

use crate::{Key, Result, Statement, Value};

/// Column value of a buffered mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationValue {
    /// Plain field value.
    Value(Value),
    /// Server-assigned commit timestamp.
    CommitTimestamp,
    /// JSON document.
    Json(serde_json::Value)
}

impl From<Value> for MutationValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Ordered column/value pairs of one mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, MutationValue)>
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<MutationValue>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Append a column, builder style.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<MutationValue>) -> Self {
        self.push(column, value);
        self
    }

    /// Value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&MutationValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Columns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MutationValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A buffered write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a new row; fails if it exists.
    Insert {
        /// Target table.
        table: String,
        /// Columns to write, key columns included.
        row:   Row
    },

    /// Update an existing row identified by its key columns.
    Update {
        /// Target table.
        table:       String,
        /// Columns to write, key columns included.
        row:         Row,
        /// Columns of `row` that form the primary key.
        key_columns: Vec<String>
    },

    /// Insert a row or update it if the key exists.
    InsertOrUpdate {
        /// Target table.
        table:       String,
        /// Columns to write, key columns included.
        row:         Row,
        /// Columns of `row` that form the primary key.
        key_columns: Vec<String>
    },

    /// Delete the row with the given key.
    Delete {
        /// Target table.
        table:       String,
        /// Primary key columns, in key order.
        key_columns: Vec<String>,
        /// Primary key values, in key order.
        key:         Key
    }
}

impl Mutation {
    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Insert {
                table, ..
            }
            | Self::Update {
                table, ..
            }
            | Self::InsertOrUpdate {
                table, ..
            }
            | Self::Delete {
                table, ..
            } => table
        }
    }

    /// Short name of the operation, for logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Insert {
                ..
            } => "insert",
            Self::Update {
                ..
            } => "update",
            Self::InsertOrUpdate {
                ..
            } => "insert_or_update",
            Self::Delete {
                ..
            } => "delete"
        }
    }
}

/// Statement execution and row scanning inside a transaction.
#[async_trait]
pub trait ReadTransaction<R>: Send {
    /// Fetch at most one row.
    ///
    /// Returns `Ok(None)` when the statement yields no row.
    async fn query_one(&mut self, stmt: &Statement) -> Result<Option<R>>;

    /// Fetch every row.
    async fn query_all(&mut self, stmt: &Statement) -> Result<Vec<R>>;
}

/// A read-write transaction that accepts buffered mutations.
#[async_trait]
pub trait WriteTransaction<R>: ReadTransaction<R> {
    /// Buffer mutations for atomic commit with the transaction.
    async fn buffer_write(&mut self, mutations: Vec<Mutation>) -> Result<()>;
}

/// Trait for types that can begin a transaction.
///
/// Implemented for database pools so [`PatchSet::apply`](crate::PatchSet::apply)
/// can run in a transaction of its own.
#[allow(async_fn_in_trait)]
pub trait Transactional: Sync {
    /// Transaction type.
    type Transaction: TransactionOps;

    /// Error type for beginning a transaction.
    type Error: StdError + Send + Sync + 'static;

    /// Begin a new transaction.
    async fn begin(&self) -> Result<Self::Transaction, Self::Error>;
}

/// Trait for transaction types that can be committed or rolled back.
#[allow(async_fn_in_trait)]
pub trait TransactionOps: Sized + Send {
    /// Error type.
    type Error: StdError + Send + Sync + 'static;

    /// Commit the transaction.
    async fn commit(self) -> Result<(), Self::Error>;

    /// Rollback the transaction.
    async fn rollback(self) -> Result<(), Self::Error>;
}

/// Failure at a transaction boundary.
///
/// Reported as the source of [`Error::Database`](crate::Error::Database).
#[derive(Debug, thiserror::Error)]
pub enum TransactionError<E> {
    /// The transaction could not be opened.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] E),

    /// Buffered writes were not committed.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] E),

    /// Rollback after a failed patch did not complete.
    #[error("failed to rollback transaction: {0}")]
    Rollback(#[source] E)
}

impl<E> TransactionError<E> {
    /// Check if this is a begin error.
    pub const fn is_begin(&self) -> bool {
        matches!(self, Self::Begin(_))
    }

    /// Check if this is a commit error.
    pub const fn is_commit(&self) -> bool {
        matches!(self, Self::Commit(_))
    }

    /// Check if this is a rollback error.
    pub const fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback(_))
    }

    /// Get the inner error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Begin(e) | Self::Commit(e) | Self::Rollback(e) => e
        }
    }
}
