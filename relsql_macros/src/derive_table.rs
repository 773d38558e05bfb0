use quote::quote;
use syn::parse::ParseStream;
use syn::spanned::Spanned;

use crate::attr::attr_util::{self, NameValue};
use crate::attr::key::Key;
use crate::derive_record::RecordStruct;

pub struct TableStruct {
    pub ident: syn::Ident,
    pub name: syn::LitStr,
    pub keys: Vec<Key>,
}

impl syn::parse::Parse for TableStruct {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let record: RecordStruct = input.parse()?;
        let item = &record.item;

        let name_attr = attr_util::find_attr(&item.attrs, "table_name")
            .ok_or_else(|| syn::Error::new(item.span(), "#[table_name = \"?\"] not found"))?;
        let name = syn::parse2::<NameValue>(name_attr.tokens.clone())?.0;

        let keys = attr_util::find_attrs(&item.attrs, "key")
            .map(Key::from_attr)
            .collect::<syn::Result<Vec<_>>>()?;

        for column in keys.iter().flat_map(|key| key.columns.iter()) {
            let known = record
                .fields
                .iter()
                .any(|field| field.attribute.value() == column.name);
            if !known {
                return Err(syn::Error::new(
                    column.span,
                    format!("Key names unknown attribute {}", column.name),
                ));
            }
        }

        Ok(Self {
            ident: item.ident.clone(),
            name,
            keys,
        })
    }
}

pub fn gen_table(table: &TableStruct) -> proc_macro2::TokenStream {
    let ident = &table.ident;
    let name = &table.name;

    let keys = table.keys.iter().map(|key| {
        let columns = key.columns.iter().map(|column| &column.name);
        quote! { &[#(#columns),*] }
    });

    quote! {
        impl ::relsql::Table for #ident {
            fn name() -> &'static str {
                #name
            }

            fn keys() -> &'static [&'static [&'static str]] {
                const KEYS: &[&[&str]] = &[#(#keys),*];
                KEYS
            }
        }
    }
}
