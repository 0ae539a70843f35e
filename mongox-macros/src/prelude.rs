pub(crate) use crate::utils::{Kind, krate};
pub use darling::{FromAttributes, util::Override, util::PathList};
pub use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
pub use itertools::Itertools;
pub use proc_macro2::{Span, TokenStream};
pub use quote::quote;
pub use syn::{
    Attribute, Data, DeriveInput, Error, Expr, Field, Fields, FieldsNamed, GenericArgument, Ident,
    LitStr, PathArguments, Result, Token, Type, ext::IdentExt, parse2, spanned::Spanned,
};
