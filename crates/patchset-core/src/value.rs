// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Closed value model for staged fields, keys and stored records.
//!
//! Every value that flows through a [`FieldSet`](crate::FieldSet), a
//! [`KeySet`](crate::KeySet) or the diff engine is one of a fixed set of
//! shapes:
//!
//! | Shape | Rust source types |
//! |-------|-------------------|
//! | [`Value::Scalar`] | `bool`, `i8`..`i64`, `u8`..`u64`, `f32`, `f64`, `String` |
//! | [`Value::Optional`] | `Option<T>` of a scalar |
//! | [`Value::List`] | `Vec<T>` of a scalar |
//! | [`Value::OptionalList`] | `Vec<Option<T>>` of a scalar |
//! | [`Value::Text`] | `DateTime<Utc>`, `NaiveDate`, `Uuid`, custom text types |
//! | [`Value::OptionalText`] | `Option<_>` of a text type |
//!
//! Text values are compared by their canonical text: RFC 3339 with
//! nanosecond precision for timestamps, ISO 8601 for dates, and the
//! hyphenated form for UUIDs.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// A primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// UTF-8 string.
    String(String)
}

/// Kind of a [`Scalar`], independent of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `String`
    String
}

impl ScalarKind {
    /// Rust spelling of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String"
        }
    }
}

impl Scalar {
    /// Kind of this scalar.
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::String(_) => ScalarKind::String
        }
    }

    /// Check whether this is the zero value of its kind.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Bool(v) => !v,
            Self::I8(v) => *v == 0,
            Self::I16(v) => *v == 0,
            Self::I32(v) => *v == 0,
            Self::I64(v) => *v == 0,
            Self::U8(v) => *v == 0,
            Self::U16(v) => *v == 0,
            Self::U32(v) => *v == 0,
            Self::U64(v) => *v == 0,
            Self::F32(v) => *v == 0.0,
            Self::F64(v) => *v == 0.0,
            Self::String(v) => v.is_empty()
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => v.fmt(f),
            Self::I8(v) => v.fmt(f),
            Self::I16(v) => v.fmt(f),
            Self::I32(v) => v.fmt(f),
            Self::I64(v) => v.fmt(f),
            Self::U8(v) => v.fmt(f),
            Self::U16(v) => v.fmt(f),
            Self::U32(v) => v.fmt(f),
            Self::U64(v) => v.fmt(f),
            Self::F32(v) => v.fmt(f),
            Self::F64(v) => v.fmt(f),
            Self::String(v) => f.write_str(v)
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::I8(v) => serializer.serialize_i8(*v),
            Self::I16(v) => serializer.serialize_i16(*v),
            Self::I32(v) => serializer.serialize_i32(*v),
            Self::I64(v) => serializer.serialize_i64(*v),
            Self::U8(v) => serializer.serialize_u8(*v),
            Self::U16(v) => serializer.serialize_u16(*v),
            Self::U32(v) => serializer.serialize_u32(*v),
            Self::U64(v) => serializer.serialize_u64(*v),
            Self::F32(v) => serializer.serialize_f32(*v),
            Self::F64(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v)
        }
    }
}

/// Kind of a canonical-text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// `DateTime<Utc>` rendered as RFC 3339 with nanoseconds.
    Timestamp,
    /// `NaiveDate` rendered as `YYYY-MM-DD`.
    Date,
    /// `Uuid` rendered hyphenated.
    Uuid,
    /// Application type with its own canonical text.
    Custom
}

impl TextKind {
    /// Lowercase name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Uuid => "uuid",
            Self::Custom => "text"
        }
    }

    /// Canonical text of the kind's default value.
    fn zero_text(&self) -> String {
        match self {
            Self::Timestamp => timestamp_text(&DateTime::<Utc>::default()),
            Self::Date => NaiveDate::default().to_string(),
            Self::Uuid => Uuid::nil().hyphenated().to_string(),
            Self::Custom => String::new()
        }
    }
}

/// A value compared by its canonical text representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Text {
    kind: TextKind,
    text: String
}

impl Text {
    /// Create a text value of the given kind.
    ///
    /// The caller guarantees that `text` is canonical: two equal source
    /// values must always produce byte-identical text.
    pub fn new(kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into()
        }
    }

    /// Kind of this text value.
    #[must_use]
    pub const fn kind(&self) -> TextKind {
        self.kind
    }

    /// Canonical text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check whether this is the default value of its kind.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.text == self.kind.zero_text()
    }
}

/// A dynamically shaped field value.
///
/// # Examples
///
/// ```rust
/// use patchset_core::{Shape, Value, ScalarKind};
///
/// let v = Value::from(Some(5_i64));
/// assert_eq!(v.shape(), Shape::Optional(ScalarKind::I64));
/// assert_eq!(v.to_string(), "5");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A primitive.
    Scalar(Scalar),
    /// A nullable primitive.
    Optional(ScalarKind, Option<Scalar>),
    /// A list of primitives.
    List(ScalarKind, Vec<Scalar>),
    /// A list of nullable primitives.
    OptionalList(ScalarKind, Vec<Option<Scalar>>),
    /// A canonical-text value.
    Text(Text),
    /// A nullable canonical-text value.
    OptionalText(TextKind, Option<Text>)
}

/// Shape of a [`Value`], used to detect incomparable pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// See [`Value::Scalar`].
    Scalar(ScalarKind),
    /// See [`Value::Optional`].
    Optional(ScalarKind),
    /// See [`Value::List`].
    List(ScalarKind),
    /// See [`Value::OptionalList`].
    OptionalList(ScalarKind),
    /// See [`Value::Text`].
    Text(TextKind),
    /// See [`Value::OptionalText`].
    OptionalText(TextKind)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(k) => f.write_str(k.as_str()),
            Self::Optional(k) => write!(f, "Option<{}>", k.as_str()),
            Self::List(k) => write!(f, "Vec<{}>", k.as_str()),
            Self::OptionalList(k) => write!(f, "Vec<Option<{}>>", k.as_str()),
            Self::Text(k) => f.write_str(k.as_str()),
            Self::OptionalText(k) => write!(f, "Option<{}>", k.as_str())
        }
    }
}

impl Value {
    /// Shape of this value.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(s) => Shape::Scalar(s.kind()),
            Self::Optional(k, _) => Shape::Optional(*k),
            Self::List(k, _) => Shape::List(*k),
            Self::OptionalList(k, _) => Shape::OptionalList(*k),
            Self::Text(t) => Shape::Text(t.kind()),
            Self::OptionalText(k, _) => Shape::OptionalText(*k)
        }
    }

    /// Check whether this is the zero value of its shape.
    ///
    /// `None`, empty lists, `0`, `false`, `""` and default timestamps, dates
    /// and UUIDs are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_zero(),
            Self::Optional(_, v) => v.is_none(),
            Self::List(_, v) => v.is_empty(),
            Self::OptionalList(_, v) => v.is_empty(),
            Self::Text(t) => t.is_zero(),
            Self::OptionalText(_, v) => v.is_none()
        }
    }

    /// Build a custom canonical-text value.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Text::new(TextKind::Custom, text))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => s.fmt(f),
            Self::Optional(_, Some(s)) => s.fmt(f),
            Self::Optional(_, None) | Self::OptionalText(_, None) => f.write_str("<nil>"),
            Self::List(_, items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
            Self::OptionalList(_, items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match item {
                        Some(s) => s.fmt(f)?,
                        None => f.write_str("<nil>")?
                    }
                }
                f.write_str("]")
            }
            Self::Text(t) | Self::OptionalText(_, Some(t)) => f.write_str(t.as_str())
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => s.serialize(serializer),
            Self::Optional(_, v) => v.serialize(serializer),
            Self::List(_, v) => v.serialize(serializer),
            Self::OptionalList(_, v) => v.serialize(serializer),
            Self::Text(t) => serializer.serialize_str(t.as_str()),
            Self::OptionalText(_, v) => match v {
                Some(t) => serializer.serialize_str(t.as_str()),
                None => serializer.serialize_none()
            }
        }
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Scalar(Scalar::$variant(v))
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(v: Option<$ty>) -> Self {
                    Self::Optional(ScalarKind::$variant, v.map(Scalar::$variant))
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Self::List(ScalarKind::$variant, v.into_iter().map(Scalar::$variant).collect())
                }
            }

            impl From<Vec<Option<$ty>>> for Value {
                fn from(v: Vec<Option<$ty>>) -> Self {
                    Self::OptionalList(
                        ScalarKind::$variant,
                        v.into_iter().map(|item| item.map(Scalar::$variant)).collect()
                    )
                }
            }
        )*
    };
}

scalar_conversions!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Scalar(Scalar::String(v.to_owned()))
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        v.map(str::to_owned).into()
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        v.into_iter().map(str::to_owned).collect::<Vec<_>>().into()
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

impl From<Text> for Value {
    fn from(v: Text) -> Self {
        Self::Text(v)
    }
}

fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

macro_rules! text_conversions {
    ($($ty:ty => $kind:ident, $render:expr);* $(;)?) => {
        $(
            impl From<$ty> for Text {
                fn from(v: $ty) -> Self {
                    let render: fn(&$ty) -> String = $render;
                    Self::new(TextKind::$kind, render(&v))
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Text(Text::from(v))
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(v: Option<$ty>) -> Self {
                    Self::OptionalText(TextKind::$kind, v.map(Text::from))
                }
            }
        )*
    };
}

text_conversions!(
    DateTime<Utc> => Timestamp, timestamp_text;
    NaiveDate => Date, |d| d.format("%Y-%m-%d").to_string();
    Uuid => Uuid, |u| u.hyphenated().to_string();
);

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(Value::from(1_i32).shape(), Shape::Scalar(ScalarKind::I32));
        assert_eq!(
            Value::from(vec![Some(1_u8), None]).shape(),
            Shape::OptionalList(ScalarKind::U8)
        );
        assert_eq!(
            Value::from(None::<Uuid>).shape(),
            Shape::OptionalText(TextKind::Uuid)
        );
        assert_eq!(Shape::OptionalList(ScalarKind::I64).to_string(), "Vec<Option<i64>>");
    }

    #[test]
    fn zero_values() {
        assert!(Value::from(0_i64).is_zero());
        assert!(Value::from(String::new()).is_zero());
        assert!(Value::from(false).is_zero());
        assert!(Value::from(None::<i32>).is_zero());
        assert!(Value::from(Vec::<String>::new()).is_zero());
        assert!(Value::from(Uuid::nil()).is_zero());
        assert!(Value::from(DateTime::<Utc>::default()).is_zero());
        assert!(Value::from(NaiveDate::default()).is_zero());
        assert!(!Value::from(Some(0_i32)).is_zero());
        assert!(!Value::from("x").is_zero());
    }

    #[test]
    fn timestamps_keep_nanoseconds() {
        let ts = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .and_then(|ts| ts.with_nanosecond(123_456_789))
            .unwrap();
        assert_eq!(Text::from(ts).as_str(), "2024-05-01T12:30:00.123456789Z");
    }

    #[test]
    fn display_matches_row_id_format() {
        assert_eq!(Value::from(42_u64).to_string(), "42");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::from(vec![1_i32, 2, 3]).to_string(), "[1 2 3]");
        assert_eq!(Value::from(None::<bool>).to_string(), "<nil>");
    }

    #[test]
    fn serializes_without_kind_tags() {
        let json = serde_json::to_string(&Value::from(vec![Some(1_i64), None])).unwrap();
        assert_eq!(json, "[1,null]");
        let json = serde_json::to_string(&Value::from(Uuid::nil())).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }
}
