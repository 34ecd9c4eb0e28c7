use crate::{field_name, variant_type};
use quote::quote;

/// Returns the body of `from_value`.
pub fn derive_struct_impl(name: &syn::Ident, data: &syn::DataStruct) -> proc_macro2::TokenStream {
    let type_name = name.to_string();
    let mut fields = vec![];

    for (i, field) in data.fields.iter().enumerate() {
        let (access, label) = field_name(field, i);
        let ty = &field.ty;
        fields.push(quote! {
            #access: <#ty as ::asn1_codec::AsnType>::from_component(
                ::asn1_codec::typed::take_component(&mut components, #label),
                #label,
            )?
        });
    }

    quote! {
        let mut components = ::asn1_codec::typed::components_of(value, #type_name)?;
        ::std::result::Result::Ok(#name {
            #(#fields),*
        })
    }
}

pub fn derive_enum_impl(name: &syn::Ident, data: &syn::DataEnum) -> proc_macro2::TokenStream {
    let type_name = name.to_string();
    let arms = data.variants.iter().map(|v| {
        let ident = &v.ident;
        let alt = ident.to_string();
        let ty = variant_type(v);
        quote! {
            #alt => ::std::result::Result::Ok(#name::#ident(
                <#ty as ::asn1_codec::AsnType>::from_value(*inner)?
            ))
        }
    });

    quote! {
        match value {
            ::asn1_codec::Value::Choice(alt, inner) => match alt.as_str() {
                #(#arms,)*
                other => ::std::result::Result::Err(::asn1_codec::typed::unexpected(
                    #type_name,
                    ::std::format!("alternative {}", other),
                )),
            },
            other => ::std::result::Result::Err(::asn1_codec::typed::unexpected(
                #type_name,
                other.kind_name(),
            )),
        }
    }
}
