// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `#[derive(Request)]` implementation.
//!
//! A request shape lists the caller-facing fields of one operation. Each
//! field may carry a `#[request(...)]` attribute:
//!
//! | Key | Description |
//! |-----|-------------|
//! | `json` | JSON name; options after a comma are ignored, `"-"` hides the field |
//! | `perm` | Comma-separated permissions gating the field |
//! | `substring` | Index columns supporting substring search |
//! | `fulltext` | Index columns supporting full-text search |
//! | `ngram` | Index columns supporting n-gram search |
//!
//! ```rust,ignore
//! #[derive(Request)]
//! pub struct UserUpdate {
//!     #[request(json = "id")]
//!     pub id: i64,
//!     #[request(json = "name,omitempty", perm = "Create,Update", substring = "NameTokens")]
//!     pub name: String
//! }
//! ```

use darling::{FromDeriveInput, FromField, ast::Data, util::Ignored};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Ident, parse_macro_input};

/// Field-level attributes parsed from `#[request(...)]`.
#[derive(Debug, FromField)]
#[darling(attributes(request))]
pub struct RequestFieldAttrs {
    /// Field identifier; `None` only for tuple fields, which are rejected.
    pub ident:     Option<Ident>,
    /// Raw JSON name.
    #[darling(default)]
    pub json:      Option<String>,
    /// Raw permission tokens.
    #[darling(default)]
    pub perm:      Option<String>,
    /// Substring search keys.
    #[darling(default)]
    pub substring: Option<String>,
    /// Full-text search keys.
    #[darling(default)]
    pub fulltext:  Option<String>,
    /// N-gram search keys.
    #[darling(default)]
    pub ngram:     Option<String>
}

impl RequestFieldAttrs {
    fn search_tags(&self) -> impl Iterator<Item = TokenStream2> + '_ {
        [
            (&self.fulltext, quote! { FullText }),
            (&self.ngram, quote! { Ngram }),
            (&self.substring, quote! { Substring })
        ]
        .into_iter()
        .filter_map(|(keys, kind)| {
            keys.as_ref().map(|keys| {
                quote! {
                    ::patchset_core::SearchTag {
                        kind: ::patchset_core::SearchType::#kind,
                        keys: #keys
                    }
                }
            })
        })
    }
}

/// Parsed request shape.
#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named))]
pub struct RequestDef {
    /// Struct identifier.
    pub ident:    Ident,
    /// Struct generics.
    pub generics: syn::Generics,
    /// Named fields.
    pub data:     Data<Ignored, RequestFieldAttrs>
}

impl RequestDef {
    fn fields(&self) -> impl Iterator<Item = &RequestFieldAttrs> {
        self.data
            .as_ref()
            .take_struct()
            .map(|fields| fields.fields)
            .unwrap_or_default()
            .into_iter()
    }
}

/// Main entry point for the Request derive macro.
pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match RequestDef::from_derive_input(&input) {
        Ok(request) => generate(&request).into(),
        Err(err) => err.write_errors().into()
    }
}

fn generate(request: &RequestDef) -> TokenStream2 {
    let ident = &request.ident;
    let (impl_generics, ty_generics, where_clause) = request.generics.split_for_impl();

    let fields = request.fields().filter_map(|field| {
        let name = field.ident.as_ref()?.to_string();
        let json = field.json.as_ref().map(|json| quote! { .json(#json) });
        let perm = field.perm.as_ref().map(|perm| quote! { .perm(#perm) });
        let tags: Vec<_> = field.search_tags().collect();
        let search = (!tags.is_empty()).then(|| quote! { .search(&[#(#tags),*]) });
        Some(quote! {
            ::patchset_core::RequestField::new(#name) #json #perm #search
        })
    });

    quote! {
        impl #impl_generics ::patchset_core::Request for #ident #ty_generics #where_clause {
            fn request_fields() -> &'static [::patchset_core::RequestField] {
                const FIELDS: &[::patchset_core::RequestField] = &[#(#fields),*];
                FIELDS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn expand(input: DeriveInput) -> String {
        let def = RequestDef::from_derive_input(&input).unwrap();
        generate(&def).to_string()
    }

    #[test]
    fn generates_builder_chain() {
        let out = expand(parse_quote! {
            struct UserView {
                id: i64,
                #[request(json = "name,omitempty", perm = "Read")]
                name: String
            }
        });
        assert!(out.contains("RequestField :: new (\"id\")"));
        assert!(out.contains(
            "RequestField :: new (\"name\") . json (\"name,omitempty\") . perm (\"Read\")"
        ));
        assert!(!out.contains(". search"));
    }

    #[test]
    fn generates_search_tags() {
        let out = expand(parse_quote! {
            struct UserSearch {
                #[request(json = "name", substring = "NameTokens", ngram = "NameNgrams")]
                name: String
            }
        });
        assert!(out.contains("SearchType :: Ngram"));
        assert!(out.contains("keys : \"NameNgrams\""));
        assert!(out.contains("SearchType :: Substring"));
        assert!(!out.contains("SearchType :: FullText"));
    }

    #[test]
    fn rejects_enums_and_unknown_keys() {
        let enumeration: DeriveInput = parse_quote! {
            enum Shape {
                A
            }
        };
        assert!(RequestDef::from_derive_input(&enumeration).is_err());

        let unknown: DeriveInput = parse_quote! {
            struct Shape {
                #[request(permission = "Read")]
                name: String
            }
        };
        assert!(RequestDef::from_derive_input(&unknown).is_err());
    }
}
