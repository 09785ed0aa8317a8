//! `#[derive(Error)]` expansion.
//!
//! ```ignore
//! use evo_cpu_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum LoadError {
//!     #[error("unknown instruction `{0}`")]
//!     UnknownInstruction(String),
//!
//!     #[error("line {line}: {message}")]
//!     Syntax { line: usize, message: String },
//!
//!     #[error("empty genome")]
//!     Empty,
//! }
//! ```
//!
//! Tuple fields are referenced positionally (`{0}`), named fields by name
//! (`{line}`). Format specs such as `{0:?}` or `{value:.2}` are passed through.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = message_of(
                        &variant.attrs,
                        &variant.ident,
                        &format!("variant `{}`", variant.ident),
                    )?;
                    let ident = &variant.ident;
                    let (pattern, write) = interpolate(&variant.fields, &message, false);
                    Ok(quote! { Self::#ident #pattern => #write, })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message_of(&input.attrs, &input.ident, &format!("type `{name}`"))?;
            let (_, write) = interpolate(&data.fields, &message, true);
            write
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "#[derive(Error)] is not available for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the destructuring pattern and the `write!` call for one set of fields.
///
/// Only fields referenced by the message are bound and passed to `write!`.
/// With `on_self` the fields are read through `self` (structs) and the pattern is
/// empty; otherwise they are bound by the returned pattern (enum variants).
fn interpolate(fields: &Fields, message: &str, on_self: bool) -> (TokenStream2, TokenStream2) {
    match fields {
        Fields::Unit => (quote! {}, quote! { write!(f, #message) }),
        Fields::Named(named) => {
            let idents: Vec<_> = named
                .named
                .iter()
                .filter_map(|f| f.ident.as_ref())
                .filter(|ident| mentions(message, &ident.to_string()))
                .collect();
            if on_self {
                (
                    quote! {},
                    quote! { write!(f, #message, #(#idents = self.#idents),*) },
                )
            } else {
                (
                    quote! { { #(#idents,)* .. } },
                    quote! { write!(f, #message, #(#idents = #idents),*) },
                )
            }
        }
        Fields::Unnamed(unnamed) => {
            let count = unnamed.unnamed.len();
            let used: Vec<usize> = (0..count)
                .filter(|i| mentions(message, &i.to_string()))
                .collect();
            let message = positional_to_named(message, count);
            let binds: Vec<_> = used.iter().map(|i| format_ident!("field{}", i)).collect();
            if on_self {
                let indices: Vec<_> = used.iter().map(|i| syn::Index::from(*i)).collect();
                (
                    quote! {},
                    quote! { write!(f, #message, #(#binds = self.#indices),*) },
                )
            } else {
                let slots: Vec<_> = (0..count)
                    .map(|i| {
                        if used.contains(&i) {
                            let bind = format_ident!("field{}", i);
                            quote! { #bind }
                        } else {
                            quote! { _ }
                        }
                    })
                    .collect();
                (
                    quote! { ( #(#slots),* ) },
                    quote! { write!(f, #message, #(#binds = #binds),*) },
                )
            }
        }
    }
}

/// Whether `message` interpolates `name` as `{name}` or `{name:...}`.
fn mentions(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}

/// Reads the string literal out of `#[error("...")]`.
fn message_of<T: ToTokens>(attrs: &[Attribute], target: &T, described: &str) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!("{described} needs an #[error(\"...\")] message"),
        ));
    };
    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };
    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(lit)) => Ok(lit.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "the #[error] message must be a single string literal",
        )),
    }
}

/// Rewrites `{0}` / `{0:?}` into `{field0}` / `{field0:?}` so tuple fields can be
/// passed to `write!` as named arguments.
fn positional_to_named(message: &str, count: usize) -> String {
    let mut out = message.to_string();
    for i in (0..count).rev() {
        out = out
            .replace(&format!("{{{i}}}"), &format!("{{field{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{field{i}:"));
    }
    out
}
