// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Audit trail records and event-source strings.
//!
//! When change tracking is enabled for a record type, every applied patch
//! buffers one [`DataChangeEvent`] into the same transaction as the data
//! mutation. The audit table has a fixed shape:
//!
//! | Column | Content |
//! |--------|---------|
//! | `TableName` | record type name |
//! | `RowId` | key values joined with `\|` |
//! | `EventTime` | commit timestamp assigned by the database |
//! | `EventSource` | who or what made the change |
//! | `ChangeSet` | JSON object of `{"Field": {"Old": .., "New": ..}}` |

use crate::{ChangeSet, Mutation, MutationValue, ResourceName, Result, Row, Value};

/// Audit table column holding the record type name.
pub const TABLE_NAME_COLUMN: &str = "TableName";
/// Audit table column holding the row identifier.
pub const ROW_ID_COLUMN: &str = "RowId";
/// Audit table column holding the commit timestamp.
pub const EVENT_TIME_COLUMN: &str = "EventTime";
/// Audit table column holding the event source.
pub const EVENT_SOURCE_COLUMN: &str = "EventSource";
/// Audit table column holding the JSON change set.
pub const CHANGE_SET_COLUMN: &str = "ChangeSet";

/// One audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChangeEvent {
    /// Record type that changed.
    pub table_name:   ResourceName,
    /// Row identifier, see [`KeySet::row_id`](crate::KeySet::row_id).
    pub row_id:       String,
    /// Who or what made the change.
    pub event_source: String,
    /// Changed fields.
    pub change_set:   ChangeSet
}

impl DataChangeEvent {
    /// Render as a row of the audit table.
    ///
    /// `EventTime` is the commit timestamp sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`](crate::Error::Serialize) if the change
    /// set cannot be encoded.
    pub fn to_row(&self) -> Result<Row> {
        let change_set = serde_json::to_value(&self.change_set)?;
        Ok(Row::new()
            .with(TABLE_NAME_COLUMN, Value::from(self.table_name.as_str()))
            .with(ROW_ID_COLUMN, Value::from(self.row_id.as_str()))
            .with(EVENT_TIME_COLUMN, MutationValue::CommitTimestamp)
            .with(EVENT_SOURCE_COLUMN, Value::from(self.event_source.as_str()))
            .with(CHANGE_SET_COLUMN, MutationValue::Json(change_set)))
    }

    /// Insert into `table`.
    ///
    /// # Errors
    ///
    /// See [`to_row`](Self::to_row).
    pub fn insert(&self, table: &str) -> Result<Mutation> {
        Ok(Mutation::Insert {
            table: table.to_owned(),
            row:   self.to_row()?
        })
    }

    /// Insert into `table`, or overwrite the record with the same
    /// table name, row id and event time.
    ///
    /// # Errors
    ///
    /// See [`to_row`](Self::to_row).
    pub fn insert_or_update(&self, table: &str) -> Result<Mutation> {
        Ok(Mutation::InsertOrUpdate {
            table:       table.to_owned(),
            row:         self.to_row()?,
            key_columns: [TABLE_NAME_COLUMN, ROW_ID_COLUMN, EVENT_TIME_COLUMN]
                .map(str::to_owned)
                .to_vec()
        })
    }
}

/// Event source for a change made by a user: `"name (id)"`.
#[must_use]
pub fn user_event(username: &str, user_id: &str) -> String {
    format!("{username} ({user_id})")
}

/// Event source for a change made by a background process: `"Process name"`.
#[must_use]
pub fn process_event(process_name: &str) -> String {
    format!("Process {process_name}")
}

/// Event source for a process acting for a user: `"name (id): Process p"`.
#[must_use]
pub fn user_process_event(username: &str, user_id: &str, process_name: &str) -> String {
    format!("{}: {}", user_event(username, user_id), process_event(process_name))
}
