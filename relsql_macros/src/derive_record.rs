use std::collections::HashSet;

use quote::quote;
use syn::parse::ParseStream;
use syn::spanned::Spanned;

use crate::attr::attr_util::{self, NameValue};

pub struct RecordStruct {
    pub item: syn::ItemStruct,
    pub fields: Vec<RecordField>,
}

pub struct RecordField {
    pub ident: syn::Ident,
    pub ty: syn::Type,
    /// Attribute name, `#[attribute = "..."]` or else the field name
    pub attribute: syn::LitStr,
}

impl syn::parse::Parse for RecordStruct {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let item: syn::ItemStruct = input.parse()?;

        if !item.generics.params.is_empty() {
            return Err(syn::Error::new(
                item.generics.span(),
                "Generic records are not supported",
            ));
        }

        let named = match &item.fields {
            syn::Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    item.fields.span(),
                    "Expected a struct with named fields",
                ))
            }
        };

        let mut fields = Vec::with_capacity(named.named.len());
        let mut seen = HashSet::new();

        for field in &named.named {
            let ident = match &field.ident {
                Some(ident) => ident.clone(),
                None => return Err(syn::Error::new(field.span(), "Expected a named field")),
            };

            let attribute = match attr_util::find_attr(&field.attrs, "attribute") {
                Some(attr) => syn::parse2::<NameValue>(attr.tokens.clone())?.0,
                None => syn::LitStr::new(&ident.to_string(), ident.span()),
            };

            if !seen.insert(attribute.value()) {
                return Err(syn::Error::new(
                    attribute.span(),
                    format!("Duplicate attribute {}", attribute.value()),
                ));
            }

            fields.push(RecordField {
                ident,
                ty: field.ty.clone(),
                attribute,
            });
        }

        Ok(Self { item, fields })
    }
}

pub fn gen_record(record: &RecordStruct) -> proc_macro2::TokenStream {
    let ident = &record.item.ident;
    let degree = record.fields.len();

    let idents: Vec<_> = record.fields.iter().map(|field| &field.ident).collect();
    let types: Vec<_> = record.fields.iter().map(|field| &field.ty).collect();
    let attributes: Vec<_> = record.fields.iter().map(|field| &field.attribute).collect();

    quote! {
        impl ::relsql::Record for #ident {
            fn heading() -> ::relsql::Heading {
                ::relsql::Heading::new(vec![
                    #(::relsql::Attribute::of::<#types>(#attributes)),*
                ])
            }

            #[allow(unused_mut, unused_variables)]
            fn from_tuple(tuple: ::relsql::Tuple) -> ::relsql::RelResult<Self> {
                let mut values = tuple.expect_degree(#degree)?.into_iter();
                Ok(Self {
                    #(#idents: <#types as ::relsql::Domain>::decode(#attributes, values.next())?,)*
                })
            }

            fn into_tuple(self) -> ::relsql::Tuple {
                ::relsql::Tuple::new(vec![
                    #(::relsql::Domain::into_value(self.#idents)),*
                ])
            }
        }
    }
}
