//! Parsing of `#[orm(...)]` attributes.

use proc_macro2::Span;
use syn::{DeriveInput, LitStr, Result};

/// Table and column names are emitted unquoted, so they must be plain
/// `[A-Za-z_][A-Za-z0-9_]*` identifiers.
pub(crate) fn sql_ident(value: &str, span: Span, what: &str) -> Result<String> {
    let value = value.trim();
    let mut chars = value.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Ok(value.to_string())
    } else {
        Err(syn::Error::new(
            span,
            format!("{what} `{value}` is not a plain SQL identifier"),
        ))
    }
}

fn lit_ident(lit: &LitStr, what: &str) -> Result<String> {
    sql_ident(&lit.value(), lit.span(), what)
}

/// Struct-level `#[orm(table = "...")]`.
pub(crate) fn get_table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let mut table = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                table = Some(lit_ident(&lit, "table name")?);
                Ok(())
            } else {
                Err(meta.error("unsupported struct attribute; expected `table = \"...\"`"))
            }
        })?;
        if let Some(table) = table {
            return Ok(table);
        }
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "Entity requires #[orm(table = \"table_name\")] attribute",
    ))
}

/// Field-level options.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub is_identity: bool,
    pub column: Option<String>,
}

/// Merge every `#[orm(...)]` on a field: `id`, `identity`, `column = "..."`.
pub(crate) fn get_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                out.is_id = true;
            } else if meta.path.is_ident("identity") {
                out.is_identity = true;
            } else if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                out.column = Some(lit_ident(&lit, "column name")?);
            } else {
                return Err(meta.error(
                    "unsupported field attribute; expected `id`, `identity` or `column = \"...\"`",
                ));
            }
            Ok(())
        })?;
    }
    Ok(out)
}
