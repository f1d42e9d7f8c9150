// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Parameterized SQL statements.
//!
//! Statements are rendered with named parameters (`@name`), which is what
//! Spanner consumes directly. Drivers with positional placeholders use
//! [`Statement::to_positional`] to rewrite them into `$1, $2, ...`.

use std::collections::BTreeMap;

use crate::Value;

/// SQL text plus named parameter values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// SQL text with `@name` placeholders.
    pub sql:    String,
    /// Parameter values by name (without `@`).
    pub params: BTreeMap<String, Value>
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql:    sql.into(),
            params: BTreeMap::new()
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Merge another statement's parameters into this one.
    pub fn extend_params(&mut self, other: BTreeMap<String, Value>) {
        self.params.extend(other);
    }

    /// Check whether the SQL text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Rewrite named placeholders into `$n` positional ones.
    ///
    /// Each distinct name gets one position, assigned in order of first
    /// appearance; repeated names reuse it. Text inside single-quoted
    /// literals is left alone. Placeholders with no matching parameter are
    /// left untouched.
    ///
    /// # Example
    ///
    /// ```rust
    /// use patchset_core::Statement;
    ///
    /// let stmt = Statement::new("SELECT 1 WHERE a = @a AND b = @b OR a2 = @a")
    ///     .with_param("a", 1_i64)
    ///     .with_param("b", 2_i64);
    /// let (sql, values) = stmt.to_positional();
    /// assert_eq!(sql, "SELECT 1 WHERE a = $1 AND b = $2 OR a2 = $1");
    /// assert_eq!(values.len(), 2);
    /// ```
    #[must_use]
    pub fn to_positional(&self) -> (String, Vec<Value>) {
        let mut sql = String::with_capacity(self.sql.len());
        let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
        let mut values = Vec::new();
        let mut in_literal = false;

        let text = self.sql.as_str();
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                in_literal = !in_literal;
                sql.push(c);
                continue;
            }
            if c != '@' || in_literal {
                sql.push(c);
                continue;
            }

            let start = i + 1;
            let mut end = start;
            while let Some(&(j, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            let name = &text[start..end];
            match self.params.get_key_value(name) {
                Some((key, value)) => {
                    let position = *positions.entry(key.as_str()).or_insert_with(|| {
                        values.push(value.clone());
                        values.len()
                    });
                    sql.push('$');
                    sql.push_str(&position.to_string());
                }
                None => {
                    sql.push('@');
                    sql.push_str(name);
                }
            }
        }

        (sql, values)
    }
}
