use alloc::vec::Vec;
use proc_macro2::{
    Ident,
    Span,
};
use syn::{
    parse::{
        Parse,
        ParseStream,
    },
    Data,
    DeriveInput,
    Error,
    Generics,
    Result,
    Type,
};

pub struct Input {
    pub ident: Ident,
    pub generics: Generics,
    pub field_types: Vec<Type>,
}

impl Parse for Input {
    fn parse(input: ParseStream) -> Result<Self> {
        let call_site = Span::call_site();
        let derive_input = DeriveInput::parse(input)?;
        let data = match derive_input.data {
            Data::Struct(data) => data,
            // An all-zero discriminant is not guaranteed to name a variant, and a zeroed union has
            // no single field that is known to be valid.
            _ => return Err(Error::new(call_site, "input must be a struct")),
        };

        let field_types = data.fields.into_iter().map(|field| field.ty).collect();

        Ok(Input {
            ident: derive_input.ident,
            generics: derive_input.generics,
            field_types,
        })
    }
}
