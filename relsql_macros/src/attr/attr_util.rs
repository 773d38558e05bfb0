pub fn attr_has_simple_ident(attr: &syn::Attribute, name: &str) -> bool {
    let path = &attr.path;
    if path.leading_colon.is_some() || path.segments.len() != 1 {
        return false;
    }

    match path.segments.last() {
        Some(segment) => segment.ident == name,
        None => false,
    }
}

pub fn find_attr<'a>(attrs: &'a [syn::Attribute], name: &str) -> Option<&'a syn::Attribute> {
    attrs
        .iter()
        .find(|attr| attr_has_simple_ident(attr, name))
}

pub fn find_attrs<'a>(
    attrs: &'a [syn::Attribute],
    name: &'a str,
) -> impl Iterator<Item = &'a syn::Attribute> + 'a {
    attrs
        .iter()
        .filter(move |attr| attr_has_simple_ident(attr, name))
}

/// `= "literal"`, as in `#[table_name = "suppliers"]`
pub struct NameValue(pub syn::LitStr);

impl syn::parse::Parse for NameValue {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let _: syn::token::Eq = input.parse()?;
        Ok(Self(input.parse()?))
    }
}
