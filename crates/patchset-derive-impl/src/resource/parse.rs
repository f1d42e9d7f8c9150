// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attribute parsing for `#[derive(Resource)]`.
//!
//! Struct-level `#[resource(...)]` attributes are parsed with darling.
//! Field-level `#[column(...)]` attributes are marker-style and parsed by
//! hand.
//!
//! # Supported Attributes
//!
//! | Attribute | Default | Description |
//! |-----------|---------|-------------|
//! | `name` | struct name | Table and base resource name |
//! | `dialect` | `spanner` | `spanner` or `postgres` |
//! | `audit_table` | `""` | Table receiving audit records |
//! | `track_changes` | `false` | Write an audit record per mutation |
//! | `rename_all` | none | Column naming for fields without `#[column]` |
//! | `config` | none | Path of a `fn() -> Config` overriding the declared one |
//!
//! | Field attribute | Effect |
//! |-----------------|--------|
//! | `#[column("Name")]` | Stored in column `Name` |
//! | `#[column(skip)]` | Not stored, still compared by the diff engine |
//! | `#[column(ignore)]` | Invisible to the runtime |

use convert_case::{Case, Casing};
use darling::{FromDeriveInput, FromMeta};
use syn::{Attribute, DeriveInput, Ident, LitStr, Type};

/// Database dialect of `#[resource(dialect = "...")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Google Cloud Spanner.
    #[default]
    Spanner,
    /// PostgreSQL.
    Postgres
}

impl FromMeta for Dialect {
    /// Parse case-insensitively: `"spanner"` or `"postgres"`.
    fn from_string(value: &str) -> darling::Result<Self> {
        match value.to_lowercase().as_str() {
            "spanner" => Ok(Self::Spanner),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(darling::Error::unknown_value(value))
        }
    }
}

/// Column naming rule of `#[resource(rename_all = "...")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    /// `first_name`
    Snake,
    /// `FirstName`
    Pascal,
    /// `firstName`
    Camel,
    /// `first-name`
    Kebab
}

impl RenameRule {
    /// Column name of a field.
    pub fn apply(self, field: &str) -> String {
        let case = match self {
            Self::Snake => Case::Snake,
            Self::Pascal => Case::Pascal,
            Self::Camel => Case::Camel,
            Self::Kebab => Case::Kebab
        };
        field.to_case(case)
    }
}

impl FromMeta for RenameRule {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value {
            "snake_case" => Ok(Self::Snake),
            "PascalCase" => Ok(Self::Pascal),
            "camelCase" => Ok(Self::Camel),
            "kebab-case" => Ok(Self::Kebab),
            _ => Err(darling::Error::unknown_value(value))
        }
    }
}

/// Struct-level attributes parsed from `#[resource(...)]`.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(resource), supports(struct_named))]
pub struct ResourceAttrs {
    /// Struct identifier.
    pub ident: Ident,

    /// Generics of the struct; record types must not have any.
    pub generics: syn::Generics,

    /// Table name.
    #[darling(default)]
    pub name: Option<String>,

    /// Database dialect.
    #[darling(default)]
    pub dialect: Dialect,

    /// Audit table name.
    #[darling(default)]
    pub audit_table: Option<String>,

    /// Enable change tracking.
    #[darling(default)]
    pub track_changes: bool,

    /// Column naming rule for fields without `#[column]`.
    #[darling(default)]
    pub rename_all: Option<RenameRule>,

    /// Configuration override function.
    #[darling(default)]
    pub config: Option<syn::Path>
}

/// Storage of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// Stored in the named column.
    Named(String),
    /// Not stored; described without a column.
    Skip,
    /// Left out of the descriptor entirely.
    Ignore
}

/// One named field of the record type.
#[derive(Debug)]
pub struct FieldDef {
    /// Field identifier.
    pub ident:  Ident,
    /// Field type.
    pub ty:     Type,
    /// Resolved storage.
    pub column: ColumnKind
}

impl FieldDef {
    /// Logical field name.
    pub fn name(&self) -> String {
        self.ident.to_string()
    }
}

/// Parsed record type.
#[derive(Debug)]
pub struct ResourceDef {
    /// Struct identifier.
    pub ident:         Ident,
    /// Table name.
    pub name:          String,
    /// Database dialect.
    pub dialect:       Dialect,
    /// Audit table name.
    pub audit_table:   String,
    /// Change tracking flag.
    pub track_changes: bool,
    /// Configuration override function.
    pub config:        Option<syn::Path>,
    /// Fields in declaration order.
    pub fields:        Vec<FieldDef>
}

impl ResourceDef {
    /// Parse a record type from syn's `DeriveInput`.
    ///
    /// # Errors
    ///
    /// - applied to anything but a struct with named fields
    /// - generic struct
    /// - `track_changes` without `audit_table`
    /// - malformed `#[column]` attribute
    pub fn from_derive_input(input: &DeriveInput) -> darling::Result<Self> {
        let attrs = ResourceAttrs::from_derive_input(input)?;
        let mut errors = darling::Error::accumulator();

        if !attrs.generics.params.is_empty() {
            errors.push(
                darling::Error::custom("Resource can not be derived for generic structs")
                    .with_span(&attrs.generics)
            );
        }
        if attrs.track_changes && attrs.audit_table.as_deref().is_none_or(str::is_empty) {
            errors.push(
                darling::Error::custom("track_changes requires audit_table").with_span(&attrs.ident)
            );
        }

        let mut fields = Vec::new();
        if let syn::Data::Struct(data) = &input.data {
            for field in &data.fields {
                let Some(ident) = field.ident.clone() else {
                    continue;
                };
                let column = errors
                    .handle(parse_column(&field.attrs))
                    .flatten()
                    .or_else(|| {
                        attrs
                            .rename_all
                            .map(|rule| ColumnKind::Named(rule.apply(&ident.to_string())))
                    })
                    .unwrap_or(ColumnKind::Skip);
                fields.push(FieldDef {
                    ident,
                    ty: field.ty.clone(),
                    column
                });
            }
        }

        errors.finish()?;
        Ok(Self {
            name: attrs.name.unwrap_or_else(|| attrs.ident.to_string()),
            ident: attrs.ident,
            dialect: attrs.dialect,
            audit_table: attrs.audit_table.unwrap_or_default(),
            track_changes: attrs.track_changes,
            config: attrs.config,
            fields
        })
    }

    /// Fields visible to the runtime.
    pub fn described_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|field| field.column != ColumnKind::Ignore)
    }
}

/// Parse the `#[column(...)]` attribute of a field, if any.
fn parse_column(attrs: &[Attribute]) -> darling::Result<Option<ColumnKind>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("column")) else {
        return Ok(None);
    };

    if let Ok(name) = attr.parse_args::<LitStr>() {
        let value = name.value();
        if value.is_empty() || value == "-" {
            return Ok(Some(ColumnKind::Skip));
        }
        return Ok(Some(ColumnKind::Named(value)));
    }

    match attr.parse_args::<Ident>() {
        Ok(marker) if marker == "skip" => Ok(Some(ColumnKind::Skip)),
        Ok(marker) if marker == "ignore" => Ok(Some(ColumnKind::Ignore)),
        _ => Err(darling::Error::custom(
            "expected #[column(\"Name\")], #[column(skip)] or #[column(ignore)]"
        )
        .with_span(attr))
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    #[test]
    fn parses_attributes_and_columns() {
        let input: DeriveInput = parse_quote! {
            #[resource(name = "Users", dialect = "Postgres", audit_table = "Audit", track_changes)]
            struct User {
                #[column("Id")]
                id: i64,
                #[column(skip)]
                cache: String,
                #[column(ignore)]
                handle: Box<dyn Fn()>,
                plain: bool
            }
        };
        let def = ResourceDef::from_derive_input(&input).unwrap();
        assert_eq!(def.name, "Users");
        assert_eq!(def.dialect, Dialect::Postgres);
        assert!(def.track_changes);
        assert_eq!(def.fields[0].column, ColumnKind::Named("Id".into()));
        assert_eq!(def.fields[1].column, ColumnKind::Skip);
        assert_eq!(def.fields[2].column, ColumnKind::Ignore);
        assert_eq!(def.fields[3].column, ColumnKind::Skip);
        assert_eq!(def.described_fields().count(), 3);
    }

    #[test]
    fn defaults() {
        let input: DeriveInput = parse_quote! {
            struct Account {
                id: i64
            }
        };
        let def = ResourceDef::from_derive_input(&input).unwrap();
        assert_eq!(def.name, "Account");
        assert_eq!(def.dialect, Dialect::Spanner);
        assert_eq!(def.audit_table, "");
        assert!(!def.track_changes);
        assert!(def.config.is_none());
    }

    #[test]
    fn rename_all_names_unannotated_fields() {
        let input: DeriveInput = parse_quote! {
            #[resource(rename_all = "PascalCase")]
            struct Account {
                account_id: i64,
                #[column("Label")]
                display_name: String
            }
        };
        let def = ResourceDef::from_derive_input(&input).unwrap();
        assert_eq!(def.fields[0].column, ColumnKind::Named("AccountId".into()));
        assert_eq!(def.fields[1].column, ColumnKind::Named("Label".into()));
    }

    #[test]
    fn rejects_invalid_input() {
        let tracked: DeriveInput = parse_quote! {
            #[resource(track_changes)]
            struct Account {
                id: i64
            }
        };
        assert!(ResourceDef::from_derive_input(&tracked).is_err());

        let tuple: DeriveInput = parse_quote! {
            struct Account(i64);
        };
        assert!(ResourceDef::from_derive_input(&tuple).is_err());

        let bad_column: DeriveInput = parse_quote! {
            struct Account {
                #[column(1)]
                id: i64
            }
        };
        assert!(ResourceDef::from_derive_input(&bad_column).is_err());

        let bad_dialect: DeriveInput = parse_quote! {
            #[resource(dialect = "mysql")]
            struct Account {
                id: i64
            }
        };
        assert!(ResourceDef::from_derive_input(&bad_dialect).is_err());
    }

    #[test]
    fn rename_rules() {
        assert_eq!(RenameRule::Snake.apply("displayName"), "display_name");
        assert_eq!(RenameRule::Pascal.apply("display_name"), "DisplayName");
        assert_eq!(RenameRule::Camel.apply("display_name"), "displayName");
        assert_eq!(RenameRule::Kebab.apply("display_name"), "display-name");
    }
}
