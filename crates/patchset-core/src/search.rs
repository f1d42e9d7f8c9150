// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Text-search predicates.
//!
//! A request shape declares which search index columns support which
//! [`SearchType`]. A [`SearchSet`] picks one index column and a query text;
//! [`QuerySet`](crate::QuerySet) turns it into a Spanner search statement.
//!
//! Only [`SearchType::Substring`] renders SQL. The query text is split on
//! single spaces without dropping empty terms, and every term `i` becomes
//! `SEARCH_SUBSTRING(<key>, @searchsubstringterm<i>)` in an `OR` chain and
//! `SCORE_NGRAMS(<key>, @ngramscoreterm<i>)` in a `+` chain used for
//! ordering.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{DbType, Request, Statement};

/// Kind of text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Full-text search. Recognised but not implemented.
    FullText,
    /// N-gram search. Recognised but not implemented.
    Ngram,
    /// Substring search ranked by n-gram score.
    Substring
}

impl SearchType {
    /// All kinds in declaration order.
    pub const ALL: [Self; 3] = [Self::FullText, Self::Ngram, Self::Substring];

    /// Attribute name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FullText => "fulltext",
            Self::Ngram => "ngram",
            Self::Substring => "substring"
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a search index column (a token list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchKey(pub String);

impl SearchKey {
    /// Borrow the column name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A staged search predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSet {
    kind:  SearchType,
    key:   SearchKey,
    query: String
}

impl SearchSet {
    /// Search `key` with `query` using `kind`.
    pub fn new(kind: SearchType, key: impl Into<SearchKey>, query: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            query: query.into()
        }
    }

    /// Search kind.
    #[must_use]
    pub const fn kind(&self) -> SearchType {
        self.kind
    }

    /// Index column searched.
    #[must_use]
    pub const fn key(&self) -> &SearchKey {
        &self.key
    }

    /// Raw query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Search index keys declared by a request shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchKeys {
    keys: HashMap<SearchKey, SearchType>
}

impl SearchKeys {
    /// Collect the search keys of `Q` for a record stored in `db_type`.
    ///
    /// Only Spanner has search statements; for other dialects the result is
    /// empty.
    #[must_use]
    pub fn new<Q: Request>(db_type: DbType) -> Self {
        let kinds: &[SearchType] = match db_type {
            DbType::Spanner => &SearchType::ALL,
            DbType::Postgres => &[]
        };

        let mut keys = HashMap::new();
        for field in Q::request_fields() {
            for kind in kinds {
                for tag in field.search.iter().filter(|tag| tag.kind == *kind) {
                    if tag.keys.is_empty() {
                        continue;
                    }
                    for key in tag.keys.split(',') {
                        keys.insert(SearchKey::from(key), *kind);
                    }
                }
            }
        }

        Self {
            keys
        }
    }

    /// Search kind supported by `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<SearchType> {
        self.keys.get(&SearchKey::from(key)).copied()
    }

    /// Build a predicate for `key`, if the key is declared.
    #[must_use]
    pub fn search_set(&self, key: &str, query: impl Into<String>) -> Option<SearchSet> {
        self.get(key).map(|kind| SearchSet::new(kind, key, query))
    }

    /// Number of declared keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check whether no key is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Splits a query into terms and renders search fragments.
pub(crate) struct SpannerQuery<'q> {
    terms: Vec<&'q str>
}

impl<'q> SpannerQuery<'q> {
    pub(crate) fn parse(query: &'q str) -> Self {
        Self {
            terms: query.split(' ').collect()
        }
    }

    /// `SEARCH_SUBSTRING` clauses joined with `OR`.
    pub(crate) fn substring(&self, key: &SearchKey) -> Statement {
        self.render(key, "SEARCH_SUBSTRING", "searchsubstringterm", " OR ")
    }

    /// `SCORE_NGRAMS` expressions joined with `+`.
    pub(crate) fn ngram_score(&self, key: &SearchKey) -> Statement {
        self.render(key, "SCORE_NGRAMS", "ngramscoreterm", " + ")
    }

    fn render(&self, key: &SearchKey, function: &str, prefix: &str, separator: &str) -> Statement {
        let mut stmt = Statement::default();
        let mut exprs = Vec::with_capacity(self.terms.len());
        for (i, term) in self.terms.iter().enumerate() {
            let param = format!("{prefix}{i}");
            exprs.push(format!("{function}({key}, @{param})"));
            stmt.params.insert(param, (*term).into());
        }
        stmt.sql = exprs.join(separator);
        stmt
    }
}
