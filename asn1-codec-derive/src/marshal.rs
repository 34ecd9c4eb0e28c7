use crate::{field_name, variant_type, Tagging};
use quote::quote;

/// Returns the bodies of `descriptor` and `to_value`.
pub fn derive_struct_impl(
    container: &Tagging,
    data: &syn::DataStruct,
) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    let mut components = vec![];
    let mut pushes = vec![];

    for (i, field) in data.fields.iter().enumerate() {
        let (access, name) = field_name(field, i);
        let ty = &field.ty;
        let tagging = Tagging::from_attrs(&field.attrs).quote();

        components.push(quote! {
            ::asn1_codec::typed::field::<#ty>(#name, #tagging)
        });
        pushes.push(quote! {
            if let ::std::option::Option::Some(v) =
                ::asn1_codec::AsnType::to_component(&self.#access)
            {
                components.push((::std::string::String::from(#name), v));
            }
        });
    }

    let (constructor, variant) = if container.set.is_some() {
        (quote!(set), quote!(Set))
    } else {
        (quote!(sequence), quote!(Sequence))
    };
    let tagging = container.quote();

    let descriptor = quote! {
        let descriptor = ::asn1_codec::TypeDescriptor::#constructor(vec![#(#components),*]);
        ::asn1_codec::typed::tagged(descriptor, #tagging)
    };
    let to_value = quote! {
        let mut components = ::std::vec::Vec::new();
        #(#pushes)*
        ::asn1_codec::Value::#variant(components)
    };
    (descriptor, to_value)
}

pub fn derive_enum_impl(
    name: &syn::Ident,
    container: &Tagging,
    data: &syn::DataEnum,
) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    let mut alternatives = vec![];
    let mut arms = vec![];

    for v in data.variants.iter() {
        let ident = &v.ident;
        let alt = ident.to_string();
        let ty = variant_type(v);
        let tagging = Tagging::from_attrs(&v.attrs).quote();

        alternatives.push(quote! {
            ::asn1_codec::typed::field::<#ty>(#alt, #tagging)
        });
        arms.push(quote! {
            #name::#ident(value) => ::asn1_codec::Value::Choice(
                ::std::string::String::from(#alt),
                ::std::boxed::Box::new(::asn1_codec::AsnType::to_value(value)),
            )
        });
    }

    let tagging = container.quote();
    let descriptor = quote! {
        let descriptor = ::asn1_codec::TypeDescriptor::choice(vec![#(#alternatives),*]);
        ::asn1_codec::typed::tagged(descriptor, #tagging)
    };
    let to_value = quote! {
        match self {
            #(#arms),*
        }
    };
    (descriptor, to_value)
}
