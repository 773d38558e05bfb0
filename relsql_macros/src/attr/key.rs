use proc_macro2::Span;
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;

/// `#[key(SNO)]` or `#[key(SName, "City")]`
pub struct Key {
    pub columns: Vec<KeyColumn>,
}

pub struct KeyColumn {
    pub span: Span,
    pub name: String,
}

impl Key {
    pub fn from_attr(attr: &syn::Attribute) -> syn::Result<Self> {
        let columns: Punctuated<KeyColumn, syn::token::Comma> =
            attr.parse_args_with(Punctuated::parse_terminated)?;

        if columns.is_empty() {
            return Err(syn::Error::new(
                attr.span(),
                "A key must name at least one attribute",
            ));
        }

        Ok(Self {
            columns: columns.into_iter().collect(),
        })
    }
}

impl syn::parse::Parse for KeyColumn {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(syn::LitStr) {
            let lit: syn::LitStr = input.parse()?;
            Ok(Self {
                span: lit.span(),
                name: lit.value(),
            })
        } else {
            let ident: syn::Ident = input.parse()?;
            Ok(Self {
                span: ident.span(),
                name: ident.to_string(),
            })
        }
    }
}
