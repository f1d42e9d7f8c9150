// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Read queries over one record type.
//!
//! A [`QuerySet`] collects the fields to project, the key to filter on and
//! an optional search predicate, then renders a [`Statement`] for the
//! record's configured dialect.
//!
//! # Rendering
//!
//! | Part | Spanner | PostgreSQL |
//! |------|---------|------------|
//! | Columns | `a, b` | `"a", "b"` |
//! | Where | `WHERE Id = @id` | `WHERE "Id" = @id` |
//! | Search | `WHERE <substring> ORDER BY <score> DESC` | not supported |
//!
//! Columns are emitted in field declaration order regardless of the order
//! fields were added. Key parameters are named by the lowercase column.

use std::{marker::PhantomData, sync::Arc};

use tracing::trace;

use crate::{
    DbType, Error, Field, FieldSet, KeySet, ReadTransaction, Resource, ResourceMetadata,
    ResourceName, Result, SearchSet, SearchType, Statement, Value, metadata::metadata_for,
    search::SpannerQuery
};

/// Projection, key filter and search predicate for reading `R`.
///
/// # Example
///
/// ```rust,ignore
/// let mut query = QuerySet::<Account>::new();
/// query.add_field("name").add_field("id");
/// query.set_key("id", 42_i64);
///
/// let account = query.read(&mut txn).await?;
/// ```
#[derive(Debug, Clone)]
pub struct QuerySet<R> {
    meta:    Arc<ResourceMetadata>,
    fields:  Vec<Field>,
    keys:    FieldSet,
    search:  Option<SearchSet>,
    _marker: PhantomData<fn() -> R>
}

impl<R: Resource> Default for QuerySet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> QuerySet<R> {
    /// Create a query using metadata from the process-wide registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metadata(metadata_for::<R>())
    }

    /// Create a query using explicitly supplied metadata.
    #[must_use]
    pub fn with_metadata(meta: Arc<ResourceMetadata>) -> Self {
        Self {
            meta,
            fields: Vec::new(),
            keys: FieldSet::new(),
            search: None,
            _marker: PhantomData
        }
    }

    /// Record type name, also the table name.
    #[must_use]
    pub fn resource(&self) -> ResourceName {
        R::resource_name()
    }
}

impl<R> QuerySet<R> {
    /// Add a field to the projection. Adding a field twice has no effect.
    pub fn add_field(&mut self, field: impl Into<Field>) -> &mut Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    /// Projected fields in the order they were added.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of projected fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether no field is projected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a key component.
    pub fn set_key(&mut self, field: impl Into<Field>, value: impl Into<Value>) {
        self.keys.set(field, value);
    }

    /// Value of a key component.
    #[must_use]
    pub fn key(&self, field: &str) -> Option<&Value> {
        self.keys.get(field)
    }

    /// Key components in the order they were set.
    #[must_use]
    pub fn key_set(&self) -> KeySet {
        self.keys.key_set()
    }

    /// Stage a search predicate, replacing any previous one.
    pub fn set_search_param(&mut self, search: SearchSet) {
        self.search = Some(search);
    }

    /// Staged search predicate.
    #[must_use]
    pub const fn search(&self) -> Option<&SearchSet> {
        self.search.as_ref()
    }

    /// Metadata the query renders against.
    #[must_use]
    pub const fn metadata(&self) -> &Arc<ResourceMetadata> {
        &self.meta
    }

    /// Projected column list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if a projected field has no column.
    pub fn columns(&self) -> Result<String> {
        let mut entries = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let entry = self.meta.column(field.as_str()).ok_or_else(|| self.unknown(field))?;
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.index);

        let db_type = self.meta.db_type();
        let columns: Vec<String> = entries
            .iter()
            .map(|entry| db_type.quote(entry.column))
            .collect();
        Ok(columns.join(", "))
    }

    /// `WHERE` clause over the key components, empty when no key is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if a key field has no column.
    pub fn where_clause(&self) -> Result<Statement> {
        let key_set = self.keys.key_set();
        if key_set.is_empty() {
            return Ok(Statement::default());
        }

        let db_type = self.meta.db_type();
        let mut stmt = Statement::default();
        let mut predicates = Vec::with_capacity(key_set.len());
        for part in key_set.parts() {
            let entry = self.meta.column(part.key.as_str()).ok_or_else(|| self.unknown(&part.key))?;
            let param = entry.column.to_lowercase();
            predicates.push(format!("{} = @{param}", db_type.quote(entry.column)));
            stmt.params.insert(param, part.value.clone());
        }
        stmt.sql = format!("WHERE {}", predicates.join(" AND "));
        Ok(stmt)
    }

    /// Render the Spanner statement.
    ///
    /// With a search predicate staged, the statement filters by the
    /// substring predicate and orders by n-gram score; otherwise it filters
    /// by key.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongDialect`] if the record is not stored in Spanner
    /// - [`Error::SearchNotImplemented`] for full-text and n-gram search
    /// - [`Error::UnknownField`] for a field without a column
    pub fn spanner_statement(&self) -> Result<Statement> {
        self.expect_dialect(DbType::Spanner)?;

        let stmt = match &self.search {
            Some(search) => self.search_statement(search)?,
            None => self.index_statement()?
        };
        trace!(resource = %self.meta.resource(), sql = %stmt.sql, "rendered spanner statement");
        Ok(stmt)
    }

    /// Render the PostgreSQL statement.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongDialect`] if the record is not stored in PostgreSQL
    /// - [`Error::SearchUnsupported`] if a search predicate is staged
    /// - [`Error::UnknownField`] for a field without a column
    pub fn postgres_statement(&self) -> Result<Statement> {
        self.expect_dialect(DbType::Postgres)?;
        if self.search.is_some() {
            return Err(Error::SearchUnsupported(DbType::Postgres));
        }

        let stmt = self.index_statement()?;
        trace!(resource = %self.meta.resource(), sql = %stmt.sql, "rendered postgres statement");
        Ok(stmt)
    }

    /// Render the statement for the record's configured dialect.
    ///
    /// # Errors
    ///
    /// See [`spanner_statement`](Self::spanner_statement) and
    /// [`postgres_statement`](Self::postgres_statement).
    pub fn statement(&self) -> Result<Statement> {
        match self.meta.db_type() {
            DbType::Spanner => self.spanner_statement(),
            DbType::Postgres => self.postgres_statement()
        }
    }

    /// Read the single row matching the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no row matches, plus any rendering
    /// or database error.
    pub async fn read<T>(&self, txn: &mut T) -> Result<R>
    where
        T: ReadTransaction<R> + ?Sized
    {
        let stmt = self.statement()?;
        txn.query_one(&stmt).await?.ok_or_else(|| Error::NotFound {
            resource: self.meta.resource().clone(),
            key:      self.keys.key_set().to_string()
        })
    }

    /// Read every matching row.
    ///
    /// # Errors
    ///
    /// Returns any rendering or database error.
    pub async fn list<T>(&self, txn: &mut T) -> Result<Vec<R>>
    where
        T: ReadTransaction<R> + ?Sized
    {
        let stmt = self.statement()?;
        txn.query_all(&stmt).await
    }

    fn index_statement(&self) -> Result<Statement> {
        let columns = self.columns()?;
        let mut where_clause = self.where_clause()?;

        let table = self.meta.db_type().quote(self.meta.resource().as_str());
        let sql = format!("SELECT {columns} FROM {table} {}", where_clause.sql);
        where_clause.sql = sql.trim_end().to_owned();
        Ok(where_clause)
    }

    fn search_statement(&self, search: &SearchSet) -> Result<Statement> {
        let columns = self.columns()?;

        let query = SpannerQuery::parse(search.query());
        let (filter, score) = match search.kind() {
            SearchType::Substring => (query.substring(search.key()), query.ngram_score(search.key())),
            kind @ (SearchType::FullText | SearchType::Ngram) => {
                return Err(Error::SearchNotImplemented(kind));
            }
        };

        let mut stmt = Statement::new(format!(
            "SELECT {columns} FROM {} WHERE {} ORDER BY {} DESC",
            self.meta.resource(),
            filter.sql,
            score.sql
        ));
        stmt.extend_params(filter.params);
        stmt.extend_params(score.params);
        Ok(stmt)
    }

    fn expect_dialect(&self, expected: DbType) -> Result<()> {
        let actual = self.meta.db_type();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::WrongDialect {
                expected,
                actual
            })
        }
    }

    fn unknown(&self, field: &Field) -> Error {
        Error::UnknownField {
            field:    field.clone(),
            resource: self.meta.resource().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, FieldDescriptor};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Users {
        id:    i64,
        name:  String,
        email: String
    }

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
                FieldDescriptor::new("cache", None),
                FieldDescriptor::new("email", Some("Email"))
            ];
            FIELDS
        }

        fn field_value(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.as_str().into()),
                "email" => Some(self.email.as_str().into()),
                _ => None
            }
        }
    }

    #[derive(Default)]
    struct PgUsers;

    impl Resource for PgUsers {
        fn resource_name() -> ResourceName {
            ResourceName::from_static("PgUsers")
        }

        fn default_config() -> Config {
            Config::new(DbType::Postgres)
        }

        fn fields() -> &'static [FieldDescriptor] {
            Users::fields()
        }

        fn field_value(&self, _field: &str) -> Option<Value> {
            None
        }
    }

    fn spanner() -> QuerySet<Users> {
        QuerySet::with_metadata(Arc::new(ResourceMetadata::build::<Users>()))
    }

    fn postgres() -> QuerySet<PgUsers> {
        QuerySet::with_metadata(Arc::new(ResourceMetadata::build::<PgUsers>()))
    }

    #[test]
    fn columns_follow_declaration_order() {
        let mut query = spanner();
        query.add_field("email").add_field("id").add_field("email");
        assert_eq!(query.len(), 2);
        assert_eq!(query.columns().unwrap(), "Id, Email");
    }

    #[test]
    fn postgres_quotes_columns() {
        let mut query = postgres();
        query.add_field("name").add_field("id");
        assert_eq!(query.columns().unwrap(), "\"Id\", \"Name\"");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut query = spanner();
        query.add_field("cache");
        assert!(matches!(query.columns(), Err(Error::UnknownField { .. })));
    }

    #[test]
    fn where_clause_uses_lowercase_params() {
        let mut query = spanner();
        query.set_key("id", 7_i64);
        query.set_key("name", "x");
        let stmt = query.where_clause().unwrap();
        assert_eq!(stmt.sql, "WHERE Id = @id AND Name = @name");
        assert_eq!(stmt.params.get("id"), Some(&Value::from(7_i64)));
        assert_eq!(stmt.params.get("name"), Some(&Value::from("x")));

        let mut query = postgres();
        query.set_key("id", 7_i64);
        assert_eq!(query.where_clause().unwrap().sql, "WHERE \"Id\" = @id");
    }

    #[test]
    fn where_clause_empty_without_key() {
        assert!(spanner().where_clause().unwrap().is_empty());
    }

    #[test]
    fn spanner_index_statement() {
        let mut query = spanner();
        query.add_field("name").add_field("id");
        query.set_key("id", 1_i64);
        let stmt = query.spanner_statement().unwrap();
        assert_eq!(stmt.sql, "SELECT Id, Name FROM Users WHERE Id = @id");
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn list_statement_without_key() {
        let mut query = postgres();
        query.add_field("id");
        assert_eq!(query.postgres_statement().unwrap().sql, "SELECT \"Id\" FROM \"PgUsers\"");
    }

    #[test]
    fn postgres_quotes_table() {
        let mut query = postgres();
        query.add_field("id").add_field("name");
        query.set_key("id", 3_i64);
        assert_eq!(
            query.statement().unwrap().sql,
            "SELECT \"Id\", \"Name\" FROM \"PgUsers\" WHERE \"Id\" = @id"
        );
    }

    #[test]
    fn spanner_search_statement() {
        let mut query = spanner();
        query.add_field("id").add_field("name");
        query.set_search_param(SearchSet::new(SearchType::Substring, "NameTokens", "mike john"));
        let stmt = query.statement().unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT Id, Name FROM Users WHERE SEARCH_SUBSTRING(NameTokens, @searchsubstringterm0) OR \
             SEARCH_SUBSTRING(NameTokens, @searchsubstringterm1) ORDER BY \
             SCORE_NGRAMS(NameTokens, @ngramscoreterm0) + SCORE_NGRAMS(NameTokens, @ngramscoreterm1) DESC"
        );
        assert_eq!(stmt.params.len(), 4);
        assert_eq!(stmt.params.get("ngramscoreterm1"), Some(&Value::from("john")));
    }

    #[test]
    fn unimplemented_search_kinds() {
        for kind in [SearchType::FullText, SearchType::Ngram] {
            let mut query = spanner();
            query.add_field("id");
            query.set_search_param(SearchSet::new(kind, "T", "x"));
            assert!(matches!(
                query.spanner_statement(),
                Err(Error::SearchNotImplemented(k)) if k == kind
            ));
        }
    }

    #[test]
    fn dialect_mismatch() {
        let mut query = spanner();
        query.add_field("id");
        assert!(matches!(
            query.postgres_statement(),
            Err(Error::WrongDialect {
                expected: DbType::Postgres,
                actual:   DbType::Spanner
            })
        ));
        assert!(matches!(postgres().spanner_statement(), Err(Error::WrongDialect { .. })));
    }

    #[test]
    fn postgres_rejects_search() {
        let mut query = postgres();
        query.add_field("id");
        query.set_search_param(SearchSet::new(SearchType::Substring, "T", "x"));
        assert!(matches!(
            query.postgres_statement(),
            Err(Error::SearchUnsupported(DbType::Postgres))
        ));
    }

    #[test]
    fn key_accessors() {
        let mut query = spanner();
        query.set_key("id", 3_i64);
        assert_eq!(query.key("id"), Some(&Value::from(3_i64)));
        assert_eq!(query.key_set().to_string(), "id: 3");
        assert_eq!(query.resource(), "Users");
    }
}
