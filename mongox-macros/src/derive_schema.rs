use crate::{
    prelude::*,
    utils::{apply_rename_all, extract_named_fields, extract_serde_field, extract_serde_rename_all},
};

#[derive(Default, FromAttributes)]
#[darling(attributes(mongox))]
struct FieldAttributes {
    #[darling(default)]
    auto_id: bool,
    auto_create_time: Option<Override<String>>,
    auto_update_time: Option<Override<String>>,
}

impl FieldAttributes {
    fn unit(directive: Option<&Override<String>>) -> Option<&str> {
        directive.map(|unit| match unit {
            Override::Inherit => "",
            Override::Explicit(unit) => unit.as_str(),
        })
    }

    fn has_time(&self) -> bool {
        self.auto_create_time.is_some() || self.auto_update_time.is_some()
    }
}

struct FieldConfig {
    ident: Ident,
    ty: Type,
    name: String,
    wire: Option<String>,
    flatten: bool,
    skip: bool,
    /// `None` when the field carries no `#[mongox(...)]` attribute.
    attributes: Option<FieldAttributes>,
    kind: Kind,
}

impl FieldConfig {
    fn parse(field: Field, rename_all: Option<&LitStr>) -> Result<Self> {
        let serde_field = extract_serde_field(&field)?;

        let attributes = if field.attrs.iter().any(|attr| attr.path().is_ident("mongox")) {
            Some(FieldAttributes::from_attributes(&field.attrs)?)
        } else {
            None
        };

        let ident = field
            .ident
            .ok_or_else(|| Error::new(Span::call_site(), "expected named field"))?;
        let name = ident.unraw().to_string();

        let wire = match (serde_field.rename, rename_all) {
            (Some(rename), _) => Some(rename),
            (None, Some(rule)) => Some(apply_rename_all(rule, &name)?),
            (None, None) => None,
        };

        Ok(Self {
            kind: Kind::of(&field.ty),
            ident,
            ty: field.ty,
            name,
            wire,
            flatten: serde_field.flatten,
            skip: serde_field.skip,
            attributes,
        })
    }

    fn validate(&self) -> Result<()> {
        let Some(attributes) = &self.attributes else {
            return Ok(());
        };

        let message = if self.flatten {
            "`#[mongox(...)]` has no effect on a flattened field"
        } else if self.skip {
            "`#[mongox(...)]` has no effect on a skipped field"
        } else if attributes.auto_id && !self.kind.holds_id() {
            "`auto_id` needs an `ObjectId` or `String` field"
        } else if attributes.has_time() && !self.kind.holds_time() {
            "auto time fields must be `bson::DateTime`, `chrono::DateTime<Utc>`, `i64` or `isize`"
        } else {
            return Ok(());
        };

        Err(Error::new_spanned(&self.ty, message))
    }

    fn def(&self, krate: &TokenStream) -> TokenStream {
        let name = &self.name;

        let bson = match &self.wire {
            Some(wire) => quote! { ::std::option::Option::Some(#wire) },
            None => quote! { ::std::option::Option::None },
        };

        let mongox = match &self.attributes {
            None if self.skip => quote! {
                ::std::option::Option::Some(#krate::field::AuxTag {
                    auto_id: false,
                    auto_create_time: ::std::option::Option::None,
                    auto_update_time: ::std::option::Option::None,
                })
            },
            Some(attributes) => {
                let auto_id = attributes.auto_id;
                let create = optional_str(FieldAttributes::unit(attributes.auto_create_time.as_ref()));
                let update = optional_str(FieldAttributes::unit(attributes.auto_update_time.as_ref()));

                quote! {
                    ::std::option::Option::Some(#krate::field::AuxTag {
                        auto_id: #auto_id,
                        auto_create_time: #create,
                        auto_update_time: #update,
                    })
                }
            }
            None => quote! { ::std::option::Option::None },
        };

        let (kind, inline) = if self.flatten {
            let ty = &self.ty;
            (
                Kind::Other.to_tokens(krate),
                quote! { <#ty as #krate::Schema>::FIELDS },
            )
        } else {
            (
                self.kind.to_tokens(krate),
                quote! { ::std::option::Option::None },
            )
        };

        quote! {
            #krate::field::FieldDef {
                name: #name,
                bson: #bson,
                mongox: #mongox,
                kind: #kind,
                inline: #inline,
            }
        }
    }

    fn slot(&self, krate: &TokenStream) -> TokenStream {
        let ident = &self.ident;

        if self.flatten {
            return quote! {
                #krate::FieldSlot::Inline(#krate::Schema::field_slots(&mut self.#ident))
            };
        }

        let conventional = !self.skip
            && matches!(self.name.as_str(), "created_at" | "updated_at")
            && self.kind.holds_time();

        match &self.attributes {
            Some(attributes) if attributes.auto_id => {
                quote! { #krate::FieldSlot::Id(&mut self.#ident) }
            }
            Some(attributes) if attributes.has_time() => {
                quote! { #krate::FieldSlot::Time(&mut self.#ident) }
            }
            None if conventional => quote! { #krate::FieldSlot::Time(&mut self.#ident) },
            _ => quote! { #krate::FieldSlot::Opaque },
        }
    }
}

fn optional_str(value: Option<&str>) -> TokenStream {
    match value {
        Some(value) => quote! { ::std::option::Option::Some(#value) },
        None => quote! { ::std::option::Option::None },
    }
}

pub fn derive_schema(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;
    build_schema(&input)
}

/// Emits `impl Schema` for a struct with named fields.
pub fn build_schema(input: &DeriveInput) -> Result<TokenStream> {
    let krate = krate();

    let rename_all = extract_serde_rename_all(&input.attrs)?;
    let fields_named = extract_named_fields(input.span(), input.data.clone())?;

    let fields = fields_named
        .named
        .into_iter()
        .map(|field| FieldConfig::parse(field, rename_all.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    for field in &fields {
        field.validate()?;
    }

    let defs = fields.iter().map(|field| field.def(&krate)).collect_vec();
    let slots = fields.iter().map(|field| field.slot(&krate)).collect_vec();

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Schema for #ident #ty_generics #where_clause {
            const FIELDS: ::std::option::Option<&'static [#krate::field::FieldDef]> =
                ::std::option::Option::Some(&[#(#defs),*]);

            fn field_slots(&mut self) -> ::std::vec::Vec<#krate::FieldSlot<'_>> {
                ::std::vec![#(#slots),*]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn error(input: TokenStream) -> String {
        derive_schema(input).unwrap_err().to_string()
    }

    #[test]
    fn classifies_supported_types() {
        assert!(Kind::of(&parse_quote!(bson::DateTime)) == Kind::Time);
        assert!(Kind::of(&parse_quote!(Option<chrono::DateTime<chrono::Utc>>)) == Kind::Time);
        assert!(Kind::of(&parse_quote!(DateTime<Local>)) == Kind::Other);
        assert!(Kind::of(&parse_quote!(Option<i64>)) == Kind::Int64);
        assert!(Kind::of(&parse_quote!(isize)) == Kind::Int);
        assert!(Kind::of(&parse_quote!(Timestamp)) == Kind::Other);
    }

    #[test]
    fn rejects_directives_on_unsupported_types() {
        let local = error(quote! {
            struct Event {
                #[mongox(auto_create_time)]
                at: DateTime<Local>,
            }
        });
        assert!(local.starts_with("auto time fields must be"));

        let alias = error(quote! {
            struct Event {
                #[mongox(auto_update_time = "milli")]
                at: Timestamp,
            }
        });
        assert!(alias.starts_with("auto time fields must be"));

        let id = error(quote! {
            struct Event {
                #[mongox(auto_id)]
                id: u32,
            }
        });
        assert_eq!(id, "`auto_id` needs an `ObjectId` or `String` field");

        let skipped = error(quote! {
            struct Event {
                #[serde(skip)]
                #[mongox(auto_update_time)]
                touched: i64,
            }
        });
        assert_eq!(skipped, "`#[mongox(...)]` has no effect on a skipped field");
    }

    #[test]
    fn unsupported_conventional_fields_stay_opaque() {
        let output = derive_schema(quote! {
            struct Event {
                created_at: DateTime<Local>,
                updated_at: Option<bson::DateTime>,
            }
        })
        .unwrap()
        .to_string();

        assert_eq!(output.matches("FieldSlot :: Opaque").count(), 1);
        assert_eq!(output.matches("FieldSlot :: Time").count(), 1);
    }
}
