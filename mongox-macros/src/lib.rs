#[warn(clippy::pedantic)]
mod derive_model;
mod derive_schema;
mod prelude;
mod utils;

fn expand<F: FnOnce(proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream>>(
    fun: F,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    fun(input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `Schema` and `Model` for a struct with named fields.
///
/// Field attributes: `#[mongox(auto_id)]`, `#[mongox(auto_create_time)]` and
/// `#[mongox(auto_update_time)]`, the time directives optionally taking a unit
/// (`= "milli"`). Container attribute: `#[mongox(hooks(before_insert, ...))]`
/// lists the hook traits the struct implements.
#[proc_macro_derive(Model, attributes(mongox))]
pub fn model(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_model::derive_model, input)
}

/// Implements `Schema` only, for structs embedded with `#[serde(flatten)]`.
#[proc_macro_derive(Schema, attributes(mongox))]
pub fn schema(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_schema::derive_schema, input)
}
