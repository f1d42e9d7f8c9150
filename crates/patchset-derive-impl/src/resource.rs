// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `#[derive(Resource)]` implementation.
//!
//! For a record type like:
//!
//! ```rust,ignore
//! #[derive(Default, Resource)]
//! #[resource(name = "Users", audit_table = "DataChangeEvents", track_changes)]
//! pub struct User {
//!     #[column("Id")]
//!     pub id: i64,
//!     #[column("Name")]
//!     pub name: String,
//!     #[column(skip)]
//!     pub cached: bool
//! }
//! ```
//!
//! the macro implements `patchset_core::Resource`: the table name, the
//! declared `Config`, a static `FieldDescriptor` table in declaration order
//! and `field_value`, which converts each described field into a `Value`.
//!
//! `#[column(skip)]` fields keep a `field_value` arm since they are still
//! diffed; fields whose type has no `Value` conversion take
//! `#[column(ignore)]` instead.

pub mod parse;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use self::parse::{ColumnKind, Dialect, ResourceDef};

/// Main entry point for the Resource derive macro.
pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ResourceDef::from_derive_input(&input) {
        Ok(resource) => generate(&resource).into(),
        Err(err) => err.write_errors().into()
    }
}

fn generate(resource: &ResourceDef) -> TokenStream2 {
    let ident = &resource.ident;
    let name = &resource.name;
    let config = config(resource);

    let descriptors = resource.described_fields().map(|field| {
        let name = field.name();
        let column = match &field.column {
            ColumnKind::Named(column) => quote! { ::core::option::Option::Some(#column) },
            ColumnKind::Skip | ColumnKind::Ignore => quote! { ::core::option::Option::None }
        };
        quote! { ::patchset_core::FieldDescriptor::new(#name, #column) }
    });

    let values = resource.described_fields().map(|field| {
        let name = field.name();
        let field_ident = &field.ident;
        let ty = &field.ty;
        quote! {
            #name => ::core::option::Option::Some(::patchset_core::Value::from(
                <#ty as ::core::clone::Clone>::clone(&self.#field_ident)
            )),
        }
    });

    quote! {
        impl ::patchset_core::Resource for #ident {
            fn resource_name() -> ::patchset_core::ResourceName {
                ::patchset_core::ResourceName::from_static(#name)
            }

            #config

            fn fields() -> &'static [::patchset_core::FieldDescriptor] {
                const FIELDS: &[::patchset_core::FieldDescriptor] = &[#(#descriptors),*];
                FIELDS
            }

            fn field_value(&self, field: &str) -> ::core::option::Option<::patchset_core::Value> {
                match field {
                    #(#values)*
                    _ => ::core::option::Option::None
                }
            }
        }
    }
}

fn config(resource: &ResourceDef) -> TokenStream2 {
    let dialect = match resource.dialect {
        Dialect::Spanner => quote! { ::patchset_core::DbType::Spanner },
        Dialect::Postgres => quote! { ::patchset_core::DbType::Postgres }
    };
    let audit_table = &resource.audit_table;
    let track_changes = resource.track_changes;

    let declared = quote! {
        fn default_config() -> ::patchset_core::Config {
            ::patchset_core::Config::new(#dialect)
                .with_change_tracking_table(#audit_table)
                .with_track_changes(#track_changes)
        }
    };

    match &resource.config {
        Some(path) => quote! {
            #declared

            fn config() -> ::patchset_core::Config {
                #path()
            }
        },
        None => declared
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn expand(input: DeriveInput) -> String {
        let def = ResourceDef::from_derive_input(&input).unwrap();
        generate(&def).to_string()
    }

    #[test]
    fn generates_descriptor_table() {
        let out = expand(parse_quote! {
            #[resource(name = "Users")]
            struct User {
                #[column("Id")]
                id: i64,
                #[column(skip)]
                cache: String,
                #[column(ignore)]
                handle: u8
            }
        });
        assert!(out.contains("FieldDescriptor :: new (\"id\" , :: core :: option :: Option :: Some (\"Id\"))"));
        assert!(out.contains("FieldDescriptor :: new (\"cache\" , :: core :: option :: Option :: None)"));
        assert!(!out.contains("\"handle\""));
        assert!(out.contains("ResourceName :: from_static (\"Users\")"));
    }

    #[test]
    fn value_arms_cover_skipped_but_not_ignored_fields() {
        let out = expand(parse_quote! {
            struct User {
                #[column("Id")]
                id: i64,
                #[column(skip)]
                display: String,
                #[column(ignore)]
                cache: std::collections::HashMap<i64, String>
            }
        });
        assert!(out.contains("\"display\" => :: core :: option :: Option :: Some"));
        assert!(!out.contains("self . cache"));
        assert!(!out.contains("HashMap"));
    }

    #[test]
    fn config_override_is_forwarded() {
        let out = expand(parse_quote! {
            #[resource(config = "crate::settings::users")]
            struct User {
                id: i64
            }
        });
        assert!(out.contains("fn config ()"));
        assert!(out.contains("crate :: settings :: users ()"));
    }

    #[test]
    fn declared_config_uses_dialect() {
        let out = expand(parse_quote! {
            #[resource(dialect = "postgres", audit_table = "Audit", track_changes)]
            struct User {
                id: i64
            }
        });
        assert!(out.contains("DbType :: Postgres"));
        assert!(out.contains("with_change_tracking_table (\"Audit\")"));
        assert!(out.contains("with_track_changes (true)"));
        assert!(!out.contains("fn config ()"));
    }
}
