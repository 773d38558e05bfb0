#![forbid(unsafe_code)]

extern crate proc_macro;

mod derive_record;
mod derive_table;

mod attr {
    pub mod attr_util;
    pub mod key;
}

use proc_macro::TokenStream;

/// Implements `relsql::Record` for a struct with named fields.
///
/// Each field is one attribute, named after the field unless renamed with
/// `#[attribute = "..."]`.
#[proc_macro_derive(Record, attributes(attribute))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let record_struct = syn::parse_macro_input!(input as derive_record::RecordStruct);

    TokenStream::from(derive_record::gen_record(&record_struct))
}

/// Implements `relsql::Table` from `#[table_name = "..."]` and any number of
/// `#[key(...)]` attributes.
#[proc_macro_derive(Table, attributes(table_name, key, attribute))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let table_struct = syn::parse_macro_input!(input as derive_table::TableStruct);

    TokenStream::from(derive_table::gen_table(&table_struct))
}
