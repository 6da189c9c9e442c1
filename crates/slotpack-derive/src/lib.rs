//! Derive macros for `slotpack::Encode` and `slotpack::Decode`.
//!
//! Structs only. Fields are encoded in declaration order, so reordering the
//! fields of a derived type changes its wire layout.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::Data;
use syn::DeriveInput;
use syn::Fields;
use syn::GenericParam;
use syn::Generics;
use syn::Index;
use syn::parse_macro_input;
use syn::parse_quote;

#[proc_macro_derive(Encode)]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_encode(input).unwrap_or_else(syn::Error::into_compile_error).into()
}

#[proc_macro_derive(Decode)]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decode(input).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn struct_fields(input: &DeriveInput) -> syn::Result<&Fields> {
    match &input.data {
        Data::Struct(data) => Ok(&data.fields),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "slotpack cannot derive for enums; encode a discriminant word by hand",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(&input.ident, "slotpack cannot derive for unions")),
    }
}

fn add_bound(mut generics: Generics, bound: syn::TypeParamBound) -> Generics {
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(bound.clone());
        }
    }
    generics
}

fn expand_encode(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = struct_fields(&input)?;
    let writes: Vec<TokenStream2> = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                let name = &f.ident;
                quote! { ::slotpack::Encode::encode(&self.#name, ser)?; }
            })
            .collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|i| {
                let index = Index::from(i);
                quote! { ::slotpack::Encode::encode(&self.#index, ser)?; }
            })
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let ident = &input.ident;
    let generics = add_bound(input.generics.clone(), parse_quote!(::slotpack::Encode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::slotpack::Encode for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn encode(&self, ser: &mut ::slotpack::Serializer<'_>) -> ::slotpack::Result<()> {
                #(#writes)*
                Ok(())
            }
        }
    })
}

fn expand_decode(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = struct_fields(&input)?;
    let body = match fields {
        Fields::Named(named) => {
            let reads = named.named.iter().map(|f| {
                let name = &f.ident;
                quote! { #name: ::slotpack::Decode::decode(de)? }
            });
            quote! { Self { #(#reads),* } }
        }
        Fields::Unnamed(unnamed) => {
            let reads = unnamed.unnamed.iter().map(|_| quote! { ::slotpack::Decode::decode(de)? });
            quote! { Self(#(#reads),*) }
        }
        Fields::Unit => quote! { Self },
    };

    let ident = &input.ident;
    let generics = add_bound(input.generics.clone(), parse_quote!(::slotpack::Decode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::slotpack::Decode for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn decode(de: &mut ::slotpack::Deserializer<'_>) -> ::slotpack::Result<Self> {
                Ok(#body)
            }
        }
    })
}
