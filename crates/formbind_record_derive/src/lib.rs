use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Type, parse_macro_input};

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "Record derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "Record derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(Span::call_site(), "Record derive is only supported on structs")
                .to_compile_error()
                .into();
        }
    };

    let formbind = formbind_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();
    let mut key_entries = Vec::new();
    let mut display_arms = Vec::new();
    let mut binding_arms = Vec::new();
    let mut identity: Option<(Ident, String)> = None;

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };

        let mut is_identity = false;
        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("identity") {
                    is_identity = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown record attribute, expected `identity`"))
                }
            });
            if let Err(error) = parsed {
                return error.to_compile_error().into();
            }
        }

        let field_ty = field.ty;
        let field_name = field_ident.to_string();
        let lens_ident = format_ident!("{model_ident}{}Lens", to_pascal_case(&field_name));

        if is_identity {
            if identity.is_some() {
                return syn::Error::new_spanned(
                    field_ident,
                    "Record derive accepts a single #[record(identity)] field",
                )
                .to_compile_error()
                .into();
            }
            if !is_option(&field_ty) {
                return syn::Error::new_spanned(
                    field_ident,
                    "the #[record(identity)] field must be an Option, unset before the store assigns it",
                )
                .to_compile_error()
                .into();
            }
            identity = Some((field_ident.clone(), field_name.clone()));
        }

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #formbind::record::AttrLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #formbind::record::AttrKey {
                    #formbind::record::AttrKey::new(#field_name)
                }

                fn get<'a>(self, record: &'a #model_ident) -> &'a Self::Value {
                    &record.#field_ident
                }

                fn set(self, record: &mut #model_ident, value: Self::Value) {
                    record.#field_ident = value;
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });

        key_entries.push(quote! {
            #formbind::record::AttrKey::new(#field_name)
        });

        display_arms.push(quote! {
            #field_name => ::core::option::Option::Some(
                #formbind::convert::BindableValue::display(&self.#field_ident),
            ),
        });

        binding_arms.push(quote! {
            #field_name => #formbind::binder::auto_binding(#lens_ident, ui, #is_identity),
        });
    }

    let identity_attr = match &identity {
        Some((_, name)) => quote! {
            ::core::option::Option::Some(#formbind::record::AttrKey::new(#name))
        },
        None => quote! { ::core::option::Option::None },
    };
    let has_identity = match &identity {
        Some((ident, _)) => quote! { self.#ident.is_some() },
        None => quote! { false },
    };

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #formbind::record::Record for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn attr_keys() -> &'static [#formbind::record::AttrKey] {
                const KEYS: &[#formbind::record::AttrKey] = &[#(#key_entries),*];
                KEYS
            }

            fn identity_attr() -> ::core::option::Option<#formbind::record::AttrKey> {
                #identity_attr
            }

            fn has_identity(&self) -> bool {
                #has_identity
            }

            fn attr_display(
                &self,
                attr: #formbind::record::AttrKey,
            ) -> ::core::option::Option<::std::string::String> {
                match attr.as_str() {
                    #(#display_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn default_binding(
                attr: #formbind::record::AttrKey,
                ui: &::std::sync::Arc<dyn #formbind::contracts::UiField>,
            ) -> ::core::option::Option<
                ::std::boxed::Box<dyn #formbind::binder::FieldBinding<#model_ident>>,
            > {
                match attr.as_str() {
                    #(#binding_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        #(#lens_defs)*
    }
    .into()
}

fn formbind_path() -> TokenStream2 {
    match crate_name("formbind") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::formbind),
    }
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
