//! Steadfast Derive Macros: compile-time object repositories
//!
//! `#[derive(PageObject)]` turns a plain struct of element handles into a
//! repository page, replacing name lookups that would otherwise fail only when
//! a scenario runs.
//!
//! # Example
//!
//! ```ignore
//! use steadfast::{Element, PageObject, Repository};
//!
//! #[derive(PageObject)]
//! struct ResultRow {
//!     #[page(root)]
//!     row: Element,
//!     title: Element,
//! }
//!
//! #[derive(PageObject)]
//! #[page(name = "search")]
//! struct SearchPage {
//!     query_input: Element,          // registered as "queryInput"
//!     #[page(rename = "go")]
//!     submit_button: Element,        // registered as "go"
//!     #[page(components)]
//!     results: Vec<ResultRow>,
//!     #[page(skip)]
//!     cached_title: String,
//! }
//!
//! let repository = Repository::builder().page_object(search_page).build()?;
//! ```
//!
//! # Field attributes
//!
//! - `#[page(rename = "...")]` - register under another name
//! - `#[page(skip)]` - leave the field out
//! - `#[page(root)]` - the component's root element
//! - `#[page(component)]` - a nested struct deriving `PageObject`
//! - `#[page(components)]` - a `Vec` of structs deriving `PageObject`
//!
//! Any other field must convert through `steadfast::IntoNode`: an `Element`,
//! a `Vec<Element>`, a `Component` or a `Vec<Component>`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Field, Fields, LitStr};

/// Derive `steadfast::PageObject` for a struct with named fields.
///
/// The page name defaults to the struct name with its first character
/// lower-cased; `#[page(name = "...")]` overrides it. Field names are
/// registered in lowerCamelCase.
#[proc_macro_derive(PageObject, attributes(page))]
pub fn derive_page_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_page_object(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_page_object(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let page_name =
        extract_name_attribute(&input.attrs)?.unwrap_or_else(|| decapitalize(&name.to_string()));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "PageObject can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "PageObject can only be derived for structs",
            ))
        }
    };

    let mut steps = Vec::with_capacity(fields.len());
    let mut has_root = false;
    for field in fields {
        let options = FieldOptions::parse(field)?;
        let Some(ident) = &field.ident else { continue };
        let key = options
            .rename
            .clone()
            .unwrap_or_else(|| to_lower_camel_case(&ident.to_string()));

        let step = match options.kind {
            FieldKind::Skip => continue,
            FieldKind::Root => {
                if has_root {
                    return Err(syn::Error::new_spanned(
                        ident,
                        "only one field can be marked #[page(root)]",
                    ));
                }
                has_root = true;
                quote! { builder.root(self.#ident) }
            }
            FieldKind::Component => quote! {
                builder.component(#key, ::steadfast::PageObject::into_component(self.#ident))
            },
            FieldKind::Components => quote! {
                builder.components(
                    #key,
                    ::std::iter::IntoIterator::into_iter(self.#ident)
                        .map(::steadfast::PageObject::into_component)
                        .collect(),
                )
            },
            FieldKind::Node => quote! { builder.node(#key, self.#ident) },
        };
        steps.push(step);
    }

    Ok(quote! {
        impl #impl_generics ::steadfast::PageObject for #name #ty_generics #where_clause {
            fn page_name() -> &'static str {
                #page_name
            }

            fn into_component(self) -> ::steadfast::Component {
                let builder = ::steadfast::Component::builder(
                    <Self as ::steadfast::PageObject>::page_name(),
                );
                #( let builder = #steps; )*
                builder.build()
            }
        }
    })
}

// ============================================================================
// Attribute Parsing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Node,
    Root,
    Component,
    Components,
    Skip,
}

#[derive(Debug)]
struct FieldOptions {
    kind: FieldKind,
    rename: Option<String>,
}

impl FieldOptions {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut options = Self {
            kind: FieldKind::Node,
            rename: None,
        };
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("page")) {
            attr.parse_nested_meta(|meta| {
                let kind = if meta.path.is_ident("skip") {
                    FieldKind::Skip
                } else if meta.path.is_ident("root") {
                    FieldKind::Root
                } else if meta.path.is_ident("component") {
                    FieldKind::Component
                } else if meta.path.is_ident("components") {
                    FieldKind::Components
                } else if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.rename = Some(value.value());
                    return Ok(());
                } else {
                    return Err(meta.error(
                        "expected one of: skip, root, component, components, rename",
                    ));
                };
                if options.kind != FieldKind::Node {
                    return Err(meta.error("conflicting #[page] field kinds"));
                }
                options.kind = kind;
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// Extract the `name` value from `#[page(name = "...")]`
fn extract_name_attribute(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("page")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Lower-case the first character: "LoginPage" -> "loginPage"
fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert snake_case to lowerCamelCase: "submit_button" -> "submitButton"
fn to_lower_camel_case(s: &str) -> String {
    let s = s.strip_prefix("r#").unwrap_or(s);
    let mut result = String::with_capacity(s.len());
    let mut upper_next = false;

    for c in s.trim_start_matches('_').chars() {
        if c == '_' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result
}
