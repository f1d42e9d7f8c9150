// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-record database configuration.
//!
//! Every record type carries a [`Config`]: the SQL dialect its statements are
//! rendered for, the audit table its change sets go to, and whether change
//! tracking is on at all. The derive macro fills in the defaults from
//! `#[resource(...)]`; applications may override them at runtime through
//! [`Resource::config`](crate::Resource::config), for example from a
//! deserialized settings file.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// SQL dialect a record type is stored in.
///
/// # Examples
///
/// ```rust
/// use patchset_core::DbType;
///
/// assert_eq!("Spanner".parse::<DbType>(), Ok(DbType::Spanner));
/// assert_eq!(DbType::Postgres.to_string(), "postgres");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// Google Cloud Spanner (GoogleSQL).
    ///
    /// - Identifiers: bare (`Id, Name`)
    /// - Parameters: named (`@id`)
    /// - Supports the substring search statement
    #[default]
    Spanner,

    /// PostgreSQL.
    ///
    /// - Identifiers: double-quoted (`"Id", "Name"`)
    /// - Parameters: named in rendered SQL, rewritten to `$n` when bound
    Postgres
}

impl DbType {
    /// Lowercase name of the dialect.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spanner => "spanner",
            Self::Postgres => "postgres"
        }
    }

    /// Quote an identifier for this dialect.
    #[must_use]
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Self::Spanner => ident.to_owned(),
            Self::Postgres => format!("\"{ident}\"")
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDbType(pub String);

impl fmt::Display for UnknownDbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dbType: {}", self.0)
    }
}

impl std::error::Error for UnknownDbType {}

impl FromStr for DbType {
    type Err = UnknownDbType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spanner" => Ok(Self::Spanner),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(UnknownDbType(s.to_owned()))
        }
    }
}

/// Storage configuration of one record type.
///
/// # Example
///
/// ```rust
/// use patchset_core::{Config, DbType};
///
/// let cfg = Config::default()
///     .with_db_type(DbType::Postgres)
///     .with_change_tracking_table("DataChangeEvents")
///     .with_track_changes(true);
///
/// assert!(cfg.track_changes);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dialect statements are rendered for.
    pub db_type: DbType,

    /// Table receiving audit records.
    pub change_tracking_table: String,

    /// Whether mutations write an audit record.
    pub track_changes: bool
}

impl Config {
    /// Create a configuration for the given dialect with tracking disabled.
    #[must_use]
    pub fn new(db_type: DbType) -> Self {
        Self {
            db_type,
            ..Self::default()
        }
    }

    /// Replace the dialect.
    #[must_use]
    pub fn with_db_type(mut self, db_type: DbType) -> Self {
        self.db_type = db_type;
        self
    }

    /// Replace the audit table name.
    #[must_use]
    pub fn with_change_tracking_table(mut self, table: impl Into<String>) -> Self {
        self.change_tracking_table = table.into();
        self
    }

    /// Enable or disable change tracking.
    #[must_use]
    pub fn with_track_changes(mut self, track_changes: bool) -> Self {
        self.track_changes = track_changes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_db_type() {
        assert_eq!("spanner".parse::<DbType>(), Ok(DbType::Spanner));
        assert_eq!("PostgreSQL".parse::<DbType>(), Ok(DbType::Postgres));
        assert!("mysql".parse::<DbType>().is_err());
    }

    #[test]
    fn quote_identifiers() {
        assert_eq!(DbType::Spanner.quote("Id"), "Id");
        assert_eq!(DbType::Postgres.quote("Id"), "\"Id\"");
    }

    #[test]
    fn setters_chain() {
        let cfg = Config::new(DbType::Postgres)
            .with_change_tracking_table("Audit")
            .with_track_changes(true);
        assert_eq!(cfg.db_type, DbType::Postgres);
        assert_eq!(cfg.change_tracking_table, "Audit");
        assert!(cfg.track_changes);
    }

    #[test]
    fn deserialize_partial_config() {
        let cfg: Config = serde_json::from_str(r#"{"db_type":"postgres"}"#).unwrap();
        assert_eq!(cfg, Config::new(DbType::Postgres));
    }
}
