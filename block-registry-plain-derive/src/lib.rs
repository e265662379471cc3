//! Procedural macro for deriving the [`block_registry::Plain`] marker on structs whose fields are
//! all plain values.
//!
//! The derived implementation requires every field type to implement `Plain`, so a struct that
//! holds a pointer, a reference, or an owning type like `String` fails to compile.
//!
//! # Example
//! ```
//! use block_registry::BlockRegistry;
//! use block_registry_plain_derive::Plain;
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq, Plain)]
//! struct Vertex {
//!     position: [f32; 3],
//!     normal: [f32; 3],
//!     material: u16,
//! }
//!
//! fn main() {
//!     let mut registry = BlockRegistry::<Vertex>::new();
//!     let mesh = registry.allocate(3).unwrap();
//!     assert!(registry.get(mesh).unwrap().iter().all(|v| *v == Vertex::default()));
//!
//!     registry.get_mut(mesh).unwrap()[0].material = 7;
//!     assert_eq!(registry.get(mesh).unwrap()[0].material, 7);
//! }
//! ```
//!
//! ```compile_fail
//! use block_registry_plain_derive::Plain;
//!
//! #[derive(Clone, Copy, Plain)]
//! struct Node {
//!     value: u32,
//!     next: *const Node,
//! }
//! ```

#![no_std]

extern crate alloc;
extern crate proc_macro;

mod parse;

use parse::Input;
use proc_macro::TokenStream;
use proc_macro2::{
    Ident,
    Span,
};
use proc_macro_crate::{
    crate_name,
    FoundCrate,
};
use quote::quote;
use syn::{
    parse_macro_input,
    parse_quote,
};

#[proc_macro_derive(Plain)]
pub fn derive_plain(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as Input);
    let ident = input.ident;

    let call_site = Span::call_site();
    let found_crate =
        crate_name("block-registry").expect("block-registry is present in `Cargo.toml`");
    let crate_token = match found_crate {
        FoundCrate::Itself => quote!(crate),
        FoundCrate::Name(name) => {
            let ident = Ident::new(&name, call_site);
            quote!(#ident)
        }
    };
    let plain = quote! {
        #crate_token::Plain
    };

    let mut generics = input.generics;
    let where_clause = generics.make_where_clause();
    for ty in &input.field_types {
        where_clause.predicates.push(parse_quote!(#ty: #plain));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    TokenStream::from(quote! {
        unsafe impl #impl_generics #plain for #ident #ty_generics #where_clause {}
    })
}
