use crate::{derive_schema::build_schema, prelude::*};

const HOOKS: [(&str, &str); 10] = [
    ("before_insert", "BeforeInsert"),
    ("after_insert", "AfterInsert"),
    ("before_update", "BeforeUpdate"),
    ("after_update", "AfterUpdate"),
    ("before_upsert", "BeforeUpsert"),
    ("after_upsert", "AfterUpsert"),
    ("before_delete", "BeforeDelete"),
    ("after_delete", "AfterDelete"),
    ("before_find", "BeforeFind"),
    ("after_find", "AfterFind"),
];

#[derive(FromAttributes)]
#[darling(attributes(mongox))]
struct Attributes {
    /// Hook traits the model implements, by method name.
    #[darling(default)]
    hooks: PathList,
}

pub fn derive_model(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    let attributes = Attributes::from_attributes(&input.attrs)?;

    let krate = krate();

    let mut capabilities = vec![];

    for hook in attributes.hooks.iter() {
        let Some((method, trait_name)) = hook
            .get_ident()
            .and_then(|ident| HOOKS.iter().find(|(method, _)| ident == method))
        else {
            return Err(Error::new_spanned(hook, "unknown hook"));
        };

        let accessor = Ident::new(&format!("as_{method}"), hook.span());
        let trait_ident = Ident::new(trait_name, Span::call_site());

        capabilities.push(quote! {
            fn #accessor(
                &mut self,
            ) -> ::std::option::Option<&mut dyn #krate::hook::#trait_ident> {
                ::std::option::Option::Some(self as &mut dyn #krate::hook::#trait_ident)
            }
        });
    }

    let schema = build_schema(&input)?;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #schema

        impl #impl_generics #krate::Model for #ident #ty_generics #where_clause {
            fn auto_fields(&mut self) -> ::std::vec::Vec<#krate::FieldSlot<'_>> {
                <Self as #krate::Schema>::field_slots(self)
            }

            #(#capabilities)*
        }
    })
}
