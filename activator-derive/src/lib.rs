//! Derive macros for activator
//!
//! `#[derive(Inject)]` generates a `Describe` impl: one constructor whose
//! parameters are the struct's `#[inject]` fields, in declaration order, plus
//! an `implements` relation for every service listed in `#[implements(...)]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use activator::{Container, Inject, Lifetime, TypeCatalog};
//! use std::sync::Arc;
//!
//! trait Repository: Send + Sync {}
//!
//! #[derive(Inject)]
//! #[implements(dyn Repository)]
//! struct UserRepository {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject]
//!     cache: Option<Arc<Cache>>,
//!     #[inject]
//!     pool_size: u32,
//!     // Fields without #[inject] use Default
//!     queries: std::sync::atomic::AtomicU64,
//! }
//!
//! impl Repository for UserRepository {}
//!
//! let types = TypeCatalog::new();
//! types.describe::<UserRepository>();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Attribute, Data, DeriveInput, Fields, Token, Type, parse_macro_input};

/// Derive the catalog description of a struct's constructor.
///
/// # Attributes
///
/// - `#[inject]` on a field makes it a constructor parameter:
///   - `Arc<T>` is a required dependency on `T`
///   - `Option<Arc<T>>` is a dependency on `T` that may be absent
///   - any other type `V` is a value parameter, cloned from its argument
/// - `#[inject(optional)]` is accepted on `Option<Arc<T>>` fields
/// - `#[implements(dyn A, dyn B)]` on the struct declares the services it can
///   be registered for
///
/// Fields without `#[inject]` are initialized with `Default::default()`.
#[proc_macro_derive(Inject, attributes(inject, implements))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(&input, "Inject can only be derived for structs with named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Inject can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let services = match find_implements(&input.attrs) {
        Ok(services) => services,
        Err(err) => return err.to_compile_error().into(),
    };

    let mut param_types = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;
        let index = param_types.len();

        match find_inject_attr(&field.attrs) {
            Some(InjectAttr::Required) => {
                if let Some(inner) = extract_option_arc_inner_type(field_type) {
                    param_types.push(inner.clone());
                    field_inits.push(quote! { #field_name: __args.service::<#inner>(#index)? });
                } else if let Some(inner) = extract_arc_inner_type(field_type) {
                    param_types.push(inner.clone());
                    field_inits.push(quote! { #field_name: __args.required::<#inner>(#index)? });
                } else {
                    param_types.push(field_type.clone());
                    field_inits.push(quote! { #field_name: __args.value::<#field_type>(#index)? });
                }
            }
            Some(InjectAttr::Optional) => {
                let Some(inner) = extract_option_arc_inner_type(field_type) else {
                    return syn::Error::new_spanned(
                        field_type,
                        "Fields marked with #[inject(optional)] must have type Option<Arc<T>>",
                    )
                    .to_compile_error()
                    .into();
                };
                param_types.push(inner.clone());
                field_inits.push(quote! { #field_name: __args.service::<#inner>(#index)? });
            }
            None => {
                field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
            }
        }
    }

    let expanded = quote! {
        impl #impl_generics ::activator::Describe for #name #ty_generics #where_clause {
            fn describe(
                class: ::activator::ClassBuilder<'_, Self>,
            ) -> ::activator::ClassBuilder<'_, Self> {
                class
                    .constructor(
                        ::std::vec![#(::activator::TypeInfo::of::<#param_types>()),*],
                        |__args: &::activator::Arguments| {
                            ::std::result::Result::Ok(Self {
                                #(#field_inits),*
                            })
                        },
                    )
                    #(
                        .implements::<#services>(|this| this as ::std::sync::Arc<#services>)
                    )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Types of inject attributes
enum InjectAttr {
    Required,
    Optional,
}

/// Find and parse the #[inject] attribute
fn find_inject_attr(attrs: &[Attribute]) -> Option<InjectAttr> {
    for attr in attrs {
        if attr.path().is_ident("inject") {
            if attr.meta.require_path_only().is_ok() {
                return Some(InjectAttr::Required);
            }

            if let Ok(nested) = attr.parse_args::<syn::Ident>() {
                if nested == "optional" {
                    return Some(InjectAttr::Optional);
                }
            }

            return Some(InjectAttr::Required);
        }
    }
    None
}

/// Collect the service types of every #[implements(...)] attribute
fn find_implements(attrs: &[Attribute]) -> syn::Result<Vec<Type>> {
    let mut services = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("implements") {
            let listed = attr.parse_args_with(Punctuated::<Type, Token![,]>::parse_terminated)?;
            services.extend(listed);
        }
    }
    Ok(services)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument_of(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument_of(ty, "Option").and_then(extract_arc_inner_type)
}

fn generic_argument_of<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == wrapper {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}
