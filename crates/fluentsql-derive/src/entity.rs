//! Entity derive macro implementation

use crate::attrs::{get_field_attr, get_table_name, sql_ident};
use heck::ToShoutySnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Result};

struct EntityField {
    ident: syn::Ident,
    ty: syn::Type,
    property: String,
    column: String,
    is_id: bool,
    is_identity: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let table_name = get_table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut entity_fields = Vec::with_capacity(fields.len());
    let mut seen_columns = HashSet::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attr = get_field_attr(field)?;
        let property = ident.unraw().to_string();
        let column = match attr.column {
            Some(column) => column,
            None => sql_ident(&property, ident.span(), "column name")?,
        };
        if !seen_columns.insert(column.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!("column `{column}` is mapped more than once"),
            ));
        }
        entity_fields.push(EntityField {
            ident,
            ty: field.ty.clone(),
            property,
            column,
            is_id: attr.is_id,
            is_identity: attr.is_identity,
        });
    }

    if entity_fields.iter().filter(|f| f.is_id).count() > 1 {
        return Err(syn::Error::new_spanned(
            name,
            "Entity supports a single #[orm(id)] field",
        ));
    }

    let column_consts = entity_fields.iter().map(|f| {
        let const_name = format_ident!("{}", f.property.to_shouty_snake_case());
        let ty = &f.ty;
        let property = &f.property;
        let column = &f.column;
        quote! {
            pub const #const_name: ::fluentsql::Column<#name, #ty> =
                ::fluentsql::Column::new(#property, #column);
        }
    });

    let descriptors = entity_fields.iter().map(|f| {
        let property = &f.property;
        let column = &f.column;
        let pk = f.is_id.then(|| quote!(.primary_key()));
        let identity = f.is_identity.then(|| quote!(.identity()));
        quote! {
            ::fluentsql::ColumnDescriptor::new(#column, #property) #pk #identity
        }
    });

    let param_inserts = entity_fields.iter().map(|f| {
        let ident = &f.ident;
        let property = &f.property;
        quote! {
            params.insert(#property, ::std::clone::Clone::clone(&self.#ident))?;
        }
    });

    let field_count = entity_fields.len();

    Ok(quote! {
        impl #name {
            #(#column_consts)*
        }

        impl ::fluentsql::Entity for #name {
            fn table() -> &'static ::fluentsql::TableDescriptor {
                static TABLE: ::fluentsql::TableDescriptor = ::fluentsql::TableDescriptor::new(
                    #table_name,
                    &[#(#descriptors),*],
                );
                &TABLE
            }

            fn to_params(&self) -> ::fluentsql::OrmResult<::fluentsql::Params> {
                let mut params = ::fluentsql::Params::with_capacity(#field_count);
                #(#param_inserts)*
                Ok(params)
            }
        }

        ::fluentsql::inventory::submit! {
            ::fluentsql::EntityRegistration {
                table: <#name as ::fluentsql::Entity>::table,
            }
        }
    })
}
