//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "FromRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ));
        }
    };

    // Generated SELECTs alias columns to property names, so fields are read
    // by their Rust name even when `#[orm(column = "...")]` renames them.
    let field_extracts = fields.iter().filter_map(|field| {
        let field_name = field.ident.as_ref()?;
        let label = field_name.unraw().to_string();
        Some(quote! {
            #field_name: ::fluentsql::RowExt::try_get_column(row, #label)?
        })
    });

    Ok(quote! {
        impl #impl_generics ::fluentsql::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::fluentsql::tokio_postgres::Row) -> ::fluentsql::OrmResult<Self> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
