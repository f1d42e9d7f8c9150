// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! PostgreSQL adapter on top of sqlx.
//!
//! [`PgPool`] begins transactions for [`PatchSet::apply`](crate::PatchSet::apply)
//! and a `sqlx::Transaction<'static, Postgres>` executes statements and
//! buffered mutations. Mutations are executed immediately inside the open
//! transaction, so they still commit or roll back together.
//!
//! | Mutation | SQL |
//! |----------|-----|
//! | `Insert` | `INSERT INTO .. VALUES ..` |
//! | `Update` | `UPDATE .. SET .. WHERE key = ..` |
//! | `InsertOrUpdate` | `INSERT .. ON CONFLICT (key) DO UPDATE SET ..` |
//! | `Delete` | `DELETE FROM .. WHERE key = ..` |
//!
//! The commit timestamp sentinel renders as `now()`, which PostgreSQL fixes
//! at transaction start.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    Arguments, Encode, FromRow, PgPool, Postgres, Type,
    postgres::{PgArguments, PgRow}
};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    DbType, Error, Mutation, MutationValue, ReadTransaction, Result, Row, Scalar, ScalarKind,
    Statement, Text, TextKind, TransactionOps, Transactional, Value, WriteTransaction
};

impl Transactional for PgPool {
    type Transaction = sqlx::Transaction<'static, Postgres>;
    type Error = sqlx::Error;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        sqlx::pool::Pool::begin(self).await
    }
}

impl TransactionOps for sqlx::Transaction<'static, Postgres> {
    type Error = sqlx::Error;

    async fn commit(self) -> Result<(), Self::Error> {
        sqlx::Transaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), Self::Error> {
        sqlx::Transaction::rollback(self).await
    }
}

#[async_trait]
impl<R> ReadTransaction<R> for sqlx::Transaction<'static, Postgres>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static
{
    async fn query_one(&mut self, stmt: &Statement) -> Result<Option<R>> {
        let (sql, values) = stmt.to_positional();
        let args = arguments(values.iter().map(Bind::Value))?;
        trace!(sql = %sql, "query one");
        sqlx::query_as_with::<_, R, _>(&sql, args)
            .fetch_optional(&mut **self)
            .await
            .map_err(Error::database)
    }

    async fn query_all(&mut self, stmt: &Statement) -> Result<Vec<R>> {
        let (sql, values) = stmt.to_positional();
        let args = arguments(values.iter().map(Bind::Value))?;
        trace!(sql = %sql, "query all");
        sqlx::query_as_with::<_, R, _>(&sql, args)
            .fetch_all(&mut **self)
            .await
            .map_err(Error::database)
    }
}

#[async_trait]
impl<R> WriteTransaction<R> for sqlx::Transaction<'static, Postgres>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static
{
    async fn buffer_write(&mut self, mutations: Vec<Mutation>) -> Result<()> {
        for mutation in &mutations {
            let rendered = render(mutation)?;
            let args = arguments(rendered.binds.into_iter())?;
            let done = sqlx::query_with(&rendered.sql, args)
                .execute(&mut **self)
                .await
                .map_err(Error::database)?;
            debug!(
                table = mutation.table(),
                operation = mutation.operation(),
                rows = done.rows_affected(),
                "executed mutation"
            );
        }
        Ok(())
    }
}

/// A value bound to a positional parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bind<'a> {
    Value(&'a Value),
    Json(&'a serde_json::Value)
}

/// SQL text with its bound values in placeholder order.
#[derive(Debug)]
struct Rendered<'a> {
    sql:   String,
    binds: Vec<Bind<'a>>
}

impl<'a> Rendered<'a> {
    fn placeholder(&mut self, value: &'a MutationValue) -> String {
        let bind = match value {
            MutationValue::CommitTimestamp => return "now()".to_owned(),
            MutationValue::Value(value) => Bind::Value(value),
            MutationValue::Json(json) => Bind::Json(json)
        };
        self.binds.push(bind);
        format!("${}", self.binds.len())
    }
}

fn quote(ident: &str) -> String {
    DbType::Postgres.quote(ident)
}

fn render(mutation: &Mutation) -> Result<Rendered<'_>> {
    let mut out = Rendered {
        sql:   String::new(),
        binds: Vec::new()
    };
    let table = quote(mutation.table());

    match mutation {
        Mutation::Insert {
            row, ..
        } => {
            let (columns, values) = insert_lists(&mut out, row);
            out.sql = format!("INSERT INTO {table} ({columns}) VALUES ({values})");
        }
        Mutation::Update {
            row,
            key_columns,
            ..
        } => {
            let assignments = row
                .iter()
                .map(|(column, value)| format!("{} = {}", quote(column), out.placeholder(value)))
                .collect::<Vec<_>>()
                .join(", ");
            let mut conditions = Vec::with_capacity(key_columns.len());
            for column in key_columns {
                let value = row.get(column).ok_or_else(|| {
                    Error::database(format!("key column {column} missing from update of {table}"))
                })?;
                conditions.push(format!("{} = {}", quote(column), out.placeholder(value)));
            }
            out.sql = format!(
                "UPDATE {table} SET {assignments} WHERE {}",
                conditions.join(" AND ")
            );
        }
        Mutation::InsertOrUpdate {
            row,
            key_columns,
            ..
        } => {
            let (columns, values) = insert_lists(&mut out, row);
            let conflict = key_columns
                .iter()
                .map(|column| quote(column))
                .collect::<Vec<_>>()
                .join(", ");
            let updates = row
                .columns()
                .filter(|column| !key_columns.iter().any(|key| key == column))
                .map(|column| format!("{0} = EXCLUDED.{0}", quote(column)))
                .collect::<Vec<_>>();
            let action = if updates.is_empty() {
                "DO NOTHING".to_owned()
            } else {
                format!("DO UPDATE SET {}", updates.join(", "))
            };
            out.sql = format!(
                "INSERT INTO {table} ({columns}) VALUES ({values}) ON CONFLICT ({conflict}) {action}"
            );
        }
        Mutation::Delete {
            key_columns,
            key,
            ..
        } => {
            if key_columns.len() != key.0.len() {
                return Err(Error::database(format!(
                    "delete from {table} has {} key columns but {} key values",
                    key_columns.len(),
                    key.0.len()
                )));
            }
            let conditions = key_columns
                .iter()
                .zip(&key.0)
                .map(|(column, value)| {
                    out.binds.push(Bind::Value(value));
                    format!("{} = ${}", quote(column), out.binds.len())
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            out.sql = format!("DELETE FROM {table} WHERE {conditions}");
        }
    }

    Ok(out)
}

fn insert_lists<'a>(out: &mut Rendered<'a>, row: &'a Row) -> (String, String) {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row.iter() {
        columns.push(quote(column));
        values.push(out.placeholder(value));
    }
    (columns.join(", "), values.join(", "))
}

fn arguments<'a>(binds: impl Iterator<Item = Bind<'a>>) -> Result<PgArguments> {
    let mut args = PgArguments::default();
    for bind in binds {
        match bind {
            Bind::Value(value) => bind_value(&mut args, value)?,
            Bind::Json(json) => add(&mut args, json.clone())?
        }
    }
    Ok(args)
}

fn add<'q, T>(args: &mut PgArguments, value: T) -> Result<()>
where
    T: 'q + Encode<'q, Postgres> + Type<Postgres>
{
    Arguments::add(args, value).map_err(Error::database)
}

fn bind_value(args: &mut PgArguments, value: &Value) -> Result<()> {
    match value {
        Value::Scalar(scalar) | Value::Optional(_, Some(scalar)) => bind_scalar(args, scalar),
        Value::Optional(kind, None) => bind_list_or_null(args, *kind, None),
        Value::List(kind, items) => {
            let items = items.iter().map(Some).collect::<Vec<_>>();
            bind_list_or_null(args, *kind, Some(&items))
        }
        Value::OptionalList(kind, items) => {
            let items = items.iter().map(Option::as_ref).collect::<Vec<_>>();
            bind_list_or_null(args, *kind, Some(&items))
        }
        Value::Text(text) => bind_text(args, text.kind(), Some(text)),
        Value::OptionalText(kind, text) => bind_text(args, *kind, text.as_ref())
    }
}

fn bind_scalar(args: &mut PgArguments, scalar: &Scalar) -> Result<()> {
    match scalar {
        Scalar::Bool(v) => add(args, *v),
        Scalar::I8(v) => add(args, i16::from(*v)),
        Scalar::I16(v) => add(args, *v),
        Scalar::I32(v) => add(args, *v),
        Scalar::I64(v) => add(args, *v),
        Scalar::U8(v) => add(args, i16::from(*v)),
        Scalar::U16(v) => add(args, i32::from(*v)),
        Scalar::U32(v) => add(args, i64::from(*v)),
        Scalar::U64(v) => add(args, unsigned_to_bigint(*v)?),
        Scalar::F32(v) => add(args, *v),
        Scalar::F64(v) => add(args, *v),
        Scalar::String(v) => add(args, v.clone())
    }
}

fn unsigned_to_bigint(v: u64) -> Result<i64> {
    i64::try_from(v).map_err(Error::database)
}

/// Collect list items of one kind into the bound element type.
///
/// `$convert` yields a `Result` of the element.
macro_rules! elements {
    ($items:expr, $kind:ident, $v:ident => $convert:expr) => {
        $items
            .iter()
            .map(|item| {
                item.map(|scalar| match scalar {
                    Scalar::$kind($v) => $convert,
                    other => Err(Error::database(format!(
                        "list element {other:?} is not {}",
                        ScalarKind::$kind.as_str()
                    )))
                })
                .transpose()
            })
            .collect::<Result<Vec<_>>>()
    };
}

/// Bind a typed array, or a typed NULL when `items` is `None`.
fn bind_list_or_null(args: &mut PgArguments, kind: ScalarKind, items: Option<&[Option<&Scalar>]>) -> Result<()> {
    macro_rules! typed {
        ($kind:ident, $ty:ty, $v:ident => $convert:expr) => {
            match items {
                None => add(args, None::<$ty>),
                Some(items) => add(args, elements!(items, $kind, $v => $convert)?)
            }
        };
    }

    match kind {
        ScalarKind::Bool => typed!(Bool, bool, v => Ok(*v)),
        ScalarKind::I8 => typed!(I8, i16, v => Ok(i16::from(*v))),
        ScalarKind::I16 => typed!(I16, i16, v => Ok(*v)),
        ScalarKind::I32 => typed!(I32, i32, v => Ok(*v)),
        ScalarKind::I64 => typed!(I64, i64, v => Ok(*v)),
        ScalarKind::U8 => typed!(U8, i16, v => Ok(i16::from(*v))),
        ScalarKind::U16 => typed!(U16, i32, v => Ok(i32::from(*v))),
        ScalarKind::U32 => typed!(U32, i64, v => Ok(i64::from(*v))),
        ScalarKind::U64 => typed!(U64, i64, v => unsigned_to_bigint(*v)),
        ScalarKind::F32 => typed!(F32, f32, v => Ok(*v)),
        ScalarKind::F64 => typed!(F64, f64, v => Ok(*v)),
        ScalarKind::String => typed!(String, String, v => Ok(v.clone()))
    }
}

fn bind_text(args: &mut PgArguments, kind: TextKind, text: Option<&Text>) -> Result<()> {
    let raw = text.map(Text::as_str);
    match kind {
        TextKind::Timestamp => {
            let ts = raw
                .map(DateTime::parse_from_rfc3339)
                .transpose()
                .map_err(Error::database)?
                .map(|ts| ts.with_timezone(&Utc));
            add(args, ts)
        }
        TextKind::Date => {
            let date = raw
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .transpose()
                .map_err(Error::database)?;
            add(args, date)
        }
        TextKind::Uuid => {
            let id = raw
                .map(Uuid::parse_str)
                .transpose()
                .map_err(Error::database)?;
            add(args, id)
        }
        TextKind::Custom => add(args, raw.map(str::to_owned))
    }
}
