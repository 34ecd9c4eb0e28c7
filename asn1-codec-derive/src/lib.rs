extern crate proc_macro;

mod marshal;
mod unmarshal;

use proc_macro_error::{abort, abort_call_site, proc_macro_error, ResultExt};
use quote::{quote, ToTokens, TokenStreamExt};
use syn::{
    self,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Ident, LitInt, Token,
};

/// `#[derive(AsnType)]`: structs become SEQUENCE (or SET with
/// `#[asn1(set)]`), enums of one-field tuple variants become CHOICE.
///
/// Fields, variants and the container itself accept
/// `#[asn1(tag = N, explicit | implicit, application | private)]`.
#[proc_macro_derive(AsnType, attributes(asn1))]
#[proc_macro_error]
pub fn asn_type_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input: syn::DeriveInput = syn::parse(input).unwrap_or_abort();
    let container = Tagging::from_attrs(&input.attrs);

    let ((descriptor, to_value), from_value) = match &input.data {
        syn::Data::Struct(v) => (
            marshal::derive_struct_impl(&container, v),
            unmarshal::derive_struct_impl(&input.ident, v),
        ),
        syn::Data::Enum(v) => (
            marshal::derive_enum_impl(&input.ident, &container, v),
            unmarshal::derive_enum_impl(&input.ident, v),
        ),
        syn::Data::Union(_) => abort_call_site!("AsnType cannot be derived for unions"),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    proc_macro::TokenStream::from(quote! {
        impl #impl_generics ::asn1_codec::AsnType for #name #ty_generics #where_clause {
            fn descriptor() -> ::asn1_codec::TypeDescriptor {
                #descriptor
            }

            fn to_value(&self) -> ::asn1_codec::Value {
                #to_value
            }

            fn from_value(value: ::asn1_codec::Value) -> ::asn1_codec::Result<Self> {
                #from_value
            }
        }
    })
}

struct QuoteOption<T>(Option<T>);

impl<T: ToTokens> ToTokens for QuoteOption<T> {
    fn to_tokens(&self, tokens: &mut proc_macro2::TokenStream) {
        tokens.append_all(match self.0 {
            Some(ref t) => quote! { ::std::option::Option::Some(#t) },
            None => quote! { ::std::option::Option::None },
        });
    }
}

#[derive(Debug)]
enum Asn1Attr {
    Explicit(Ident),
    Implicit(Ident),
    Application(Ident),
    Private(Ident),
    Set(Ident),
    Tag(Ident, u32),
}

impl Parse for Asn1Attr {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let name: Ident = input.parse()?;
        let name_str = name.to_string();

        if input.peek(Token![=]) {
            let assign_token = input.parse::<Token![=]>()?; // skip '='

            if input.peek(LitInt) {
                let lit: LitInt = input.parse()?;
                let lit_int = lit.base10_parse::<u32>()?;

                match &*name_str {
                    "tag" => Ok(Asn1Attr::Tag(name, lit_int)),
                    _ => abort!(name, "unexpected attribute: {}", name_str),
                }
            } else {
                abort!(assign_token, "expected an integer literal after `=`");
            }
        } else {
            match name_str.as_ref() {
                "explicit" => Ok(Asn1Attr::Explicit(name)),
                "implicit" => Ok(Asn1Attr::Implicit(name)),
                "application" => Ok(Asn1Attr::Application(name)),
                "private" => Ok(Asn1Attr::Private(name)),
                "set" => Ok(Asn1Attr::Set(name)),
                _ => abort!(name, "unexpected attribute: {}", name_str),
            }
        }
    }
}

fn parse_attributes(attrs: &[syn::Attribute]) -> Vec<Asn1Attr> {
    attrs
        .iter()
        .filter(|attr| attr.path.is_ident("asn1"))
        .flat_map(|attr| {
            attr.parse_args_with(Punctuated::<Asn1Attr, Token![,]>::parse_terminated)
                .unwrap_or_abort()
        })
        .collect()
}

/// The `#[asn1(...)]` settings of one field, variant or container.
#[derive(Default)]
struct Tagging {
    explicit: bool,
    application: bool,
    private: bool,
    set: Option<Ident>,
    tag: Option<u32>,
}

impl Tagging {
    fn from_attrs(attrs: &[syn::Attribute]) -> Tagging {
        let mut t = Tagging::default();
        for attr in parse_attributes(attrs) {
            match attr {
                Asn1Attr::Explicit(_) => t.explicit = true,
                Asn1Attr::Implicit(_) => t.explicit = false,
                Asn1Attr::Application(_) => t.application = true,
                Asn1Attr::Private(_) => t.private = true,
                Asn1Attr::Set(name) => t.set = Some(name),
                Asn1Attr::Tag(_, v) => t.tag = Some(v),
            }
        }
        t
    }

    /// Tokens for an `Option<asn1_codec::typed::Tagging>`.
    fn quote(&self) -> QuoteOption<proc_macro2::TokenStream> {
        let number = match self.tag {
            Some(n) => n,
            None => return QuoteOption(None),
        };
        let tag = if self.application {
            quote! { ::asn1_codec::Tag::application(#number) }
        } else if self.private {
            quote! { ::asn1_codec::Tag::private(#number) }
        } else {
            quote! { ::asn1_codec::Tag::context(#number) }
        };
        QuoteOption(Some(if self.explicit {
            quote! { ::asn1_codec::typed::Tagging::Explicit(#tag) }
        } else {
            quote! { ::asn1_codec::typed::Tagging::Implicit(#tag) }
        }))
    }
}

/// The component name of a struct field: its identifier, or `fieldN` for
/// tuple structs.
fn field_name(field: &syn::Field, i: usize) -> (proc_macro2::TokenStream, String) {
    match &field.ident {
        Some(ident) => (quote!(#ident), ident.to_string()),
        None => {
            let index = syn::Index::from(i);
            (quote!(#index), format!("field{}", i))
        }
    }
}

/// The payload type of a CHOICE variant.
fn variant_type(v: &syn::Variant) -> &syn::Type {
    match &v.fields {
        syn::Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0].ty,
        _ => abort!(v, "CHOICE variants must hold exactly one unnamed field"),
    }
}
