use crate::prelude::*;
use proc_macro_crate::{FoundCrate, crate_name};

macro_rules! extract {
    ($val:expr, $pat:pat, $error_message: expr) => {
        let $pat = $val else {
            return Err(Error::new_spanned($val, $error_message));
        };
    };
}

pub(crate) use extract;

pub fn extract_named_fields(span: Span, data: Data) -> Result<FieldsNamed> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(span, "expected struct"));
    };

    extract!(
        data_struct.fields,
        Fields::Named(named_fields),
        "expected named fields"
    );

    Ok(named_fields)
}

/// The parts of `#[serde(...)]` on a field that change its wire shape.
#[derive(Default)]
pub struct SerdeField {
    pub rename: Option<String>,
    pub flatten: bool,
    /// Never written, so it gets no auto behavior.
    pub skip: bool,
}

pub fn extract_serde_field(field: &Field) -> Result<SerdeField> {
    let mut serde_field = SerdeField::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                serde_field.rename = serialized_name(&meta)?.map(|name| name.value());
            } else if meta.path.is_ident("flatten") {
                serde_field.flatten = true;
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde_field.skip = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(serde_field)
}

/// Reads `#[serde(rename_all = "...")]` from a container.
pub fn extract_serde_rename_all(attrs: &[Attribute]) -> Result<Option<LitStr>> {
    let mut rename_all = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                rename_all = serialized_name(&meta)?;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(rename_all)
}

/// Reads `name = "..."` or the `serialize` half of `name(serialize = "...",
/// deserialize = "...")`.
fn serialized_name(meta: &syn::meta::ParseNestedMeta<'_>) -> Result<Option<LitStr>> {
    if meta.input.peek(Token![=]) {
        return Ok(Some(meta.value()?.parse()?));
    }

    let mut serialized = None;
    meta.parse_nested_meta(|nested| {
        if nested.path.is_ident("serialize") {
            serialized = Some(nested.value()?.parse()?);
        } else {
            skip_meta_value(&nested)?;
        }
        Ok(())
    })?;

    Ok(serialized)
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta<'_>) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta_value(&nested))?;
    }
    Ok(())
}

pub fn apply_rename_all(rule: &LitStr, name: &str) -> Result<String> {
    let renamed = match rule.value().as_str() {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "PascalCase" => name.to_upper_camel_case(),
        "camelCase" => name.to_lower_camel_case(),
        "snake_case" => name.to_snake_case(),
        "SCREAMING_SNAKE_CASE" => name.to_shouty_snake_case(),
        "kebab-case" => name.to_kebab_case(),
        "SCREAMING-KEBAB-CASE" => name.to_shouty_kebab_case(),
        _ => return Err(Error::new_spanned(rule, "unknown rename rule")),
    };

    Ok(renamed)
}

/// How a field type takes part in auto-population.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Time,
    Int,
    Int64,
    ObjectId,
    String,
    Other,
}

impl Kind {
    /// Classifies a type by its last path segment, looking through `Option`.
    /// `DateTime` counts as a time only without parameters (bson) or with
    /// `Utc` (chrono).
    pub fn of(ty: &Type) -> Self {
        let Type::Path(type_path) = ty else {
            return Self::Other;
        };
        let Some(segment) = type_path.path.segments.last() else {
            return Self::Other;
        };

        if segment.ident == "Option" {
            if let PathArguments::AngleBracketed(arguments) = &segment.arguments {
                if let Some(GenericArgument::Type(inner)) = arguments.args.first() {
                    return Self::of(inner);
                }
            }
            return Self::Other;
        }

        match segment.ident.to_string().as_str() {
            "DateTime" => match &segment.arguments {
                PathArguments::None => Self::Time,
                PathArguments::AngleBracketed(arguments) => match arguments.args.first() {
                    Some(GenericArgument::Type(Type::Path(zone)))
                        if zone.path.segments.last().is_some_and(|zone| zone.ident == "Utc") =>
                    {
                        Self::Time
                    }
                    _ => Self::Other,
                },
                PathArguments::Parenthesized(_) => Self::Other,
            },
            "isize" => Self::Int,
            "i64" => Self::Int64,
            "ObjectId" => Self::ObjectId,
            "String" => Self::String,
            _ => Self::Other,
        }
    }

    pub fn holds_time(self) -> bool {
        matches!(self, Self::Time | Self::Int | Self::Int64)
    }

    pub fn holds_id(self) -> bool {
        matches!(self, Self::ObjectId | Self::String)
    }

    pub fn to_tokens(self, krate: &TokenStream) -> TokenStream {
        let variant = match self {
            Self::Time => quote! { Time },
            Self::Int => quote! { Int },
            Self::Int64 => quote! { Int64 },
            Self::ObjectId => quote! { ObjectId },
            Self::String => quote! { String },
            Self::Other => quote! { Other },
        };

        quote! { #krate::field::FieldKind::#variant }
    }
}

pub fn krate() -> TokenStream {
    match crate_name("mongox") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote! { ::#ident }
        }
        Ok(FoundCrate::Itself) | Err(_) => quote! { ::mongox },
    }
}
