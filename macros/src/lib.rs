extern crate proc_macro;
mod field_parser;
mod macro_utils;
mod resource;

use proc_macro::TokenStream;
use proc_macro_error::proc_macro_error;
use syn::{parse_macro_input, ItemStruct};

/// Derives `resmap::Resource`: the declaration the registry builds a schema from,
/// domain accessors and an inventory entry for `Registry::register_all`.
///
/// ```ignore
/// #[derive(Resource, Default)]
/// #[resource(name = "posts", alias = "p")]
/// struct Post {
///     #[resource(id)]
///     id: u64,
///     #[resource(attr = "title,unique")]
///     title: String,
///     #[resource(belongs_to)]
///     author: Box<Author>,
/// }
/// ```
#[proc_macro_derive(Resource, attributes(resource))]
#[proc_macro_error]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    let item_struct = parse_macro_input!(input as ItemStruct);
    let stream = match resource::new(&item_struct) {
        Ok(stream) => stream,
        Err(e) => return e.to_compile_error().into(),
    };
    macro_utils::submit_struct_to_stream(stream, "resource", &item_struct.ident, "_derive.rs")
}
