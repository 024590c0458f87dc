use darling::util::Override;
use darling::{ast, FromDeriveInput, FromField, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use std::collections::HashMap;
use syn::{parse_macro_input, Attribute, DeriveInput, Expr, Ident, Meta, Type};

#[derive(FromDeriveInput)]
#[darling(attributes(service), supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: Ident,
    generics: syn::Generics,
    data: ast::Data<(), InjectableField>,
    /// Capability to register under; defaults to the struct itself.
    #[darling(default)]
    capability: Option<Type>,
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    context: Option<Type>,
    /// Register with the instance's `Reflect` view so attributes can be projected.
    #[darling(default)]
    reflect: bool,
    /// Preset arguments, `field = "expr"`.
    #[darling(default)]
    presets: HashMap<String, Expr>,
}

#[derive(FromField)]
#[darling(attributes(param), forward_attrs(wired))]
struct InjectableField {
    ident: Option<Ident>,
    ty: Type,
    attrs: Vec<Attribute>,
    #[darling(default)]
    default: Option<Override<Expr>>,
}

/// Arguments of an explicit `#[wired(...)]` specification.
#[derive(Default, FromMeta)]
#[darling(default)]
struct WiredArgs {
    capability: Option<Type>,
    name: Option<String>,
    /// Expression evaluating to the lookup context `Value`.
    context: Option<Expr>,
    attr: Option<String>,
    key: Option<String>,
    /// JSON array of positional call arguments.
    args: Option<String>,
    /// JSON object of named call arguments.
    kwargs: Option<String>,
    /// Call with no arguments.
    call: bool,
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let input = match InjectableInput::from_derive_input(&input) {
        Ok(input) => input,
        Err(err) => return err.write_errors().into(),
    };

    match generate_injectable_impl(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.write_errors().into(),
    }
}

fn generate_injectable_impl(input: &InjectableInput) -> darling::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        ast::Data::Struct(fields) => fields,
        ast::Data::Enum(_) => unreachable!("darling rejects enums"),
    };

    let declarations = fields
        .iter()
        .map(generate_declaration)
        .collect::<darling::Result<Vec<_>>>()?;

    let constructed = if matches!(fields.style, ast::Style::Unit) {
        quote!(Self)
    } else {
        let field_injections = fields.iter().map(generate_field_injection);
        quote!(Self { #(#field_injections),* })
    };

    let service_impl = generate_service_impl(input);

    Ok(quote! {
        impl #impl_generics ::wired_inject::Injectable for #struct_name #ty_generics #where_clause {
            fn signature() -> ::wired_inject::Result<::wired_inject::Signature> {
                #[allow(unused_variables)]
                let factory = ::std::any::type_name::<Self>();
                Ok(::wired_inject::Signature::new() #(.declare(#declarations))*)
            }

            #[allow(unused_mut)]
            fn construct(
                mut kwargs: ::wired_inject::Kwargs
            ) -> ::wired_inject::Result<Self> {
                let constructed = #constructed;
                kwargs.finish()?;
                Ok(constructed)
            }
        }

        #service_impl
    })
}

/// `Declaration::new::<Base>("field")` followed by one `.annotate(..)` per `#[wired]` attribute.
fn generate_declaration(field: &InjectableField) -> darling::Result<TokenStream2> {
    let field_name = field_name(field);
    let base = arc_inner(&field.ty).unwrap_or(&field.ty);

    let metadata = field
        .attrs
        .iter()
        .map(generate_metadata)
        .collect::<darling::Result<Vec<_>>>()?;

    Ok(quote! {
        ::wired_inject::Declaration::new::<#base>(#field_name)
            #(.annotate(#metadata))*
    })
}

fn generate_metadata(attr: &Attribute) -> darling::Result<TokenStream2> {
    if let Meta::Path(_) = &attr.meta {
        return Ok(quote!(::wired_inject::Metadata::Marker));
    }
    let args = WiredArgs::from_meta(&attr.meta)?;

    let capability = args
        .capability
        .as_ref()
        .map(|capability| quote!(.capability::<#capability>()));
    let name = args.name.as_ref().map(|name| quote!(.named(#name)));
    let context = args.context.as_ref().map(|context| quote!(.context(#context)));
    let attr = args.attr.as_ref().map(|attr| quote!(.attr(#attr)));
    let key = args.key.as_ref().map(|key| quote!(.key(#key)));

    let invocation = if args.args.is_some() || args.kwargs.is_some() || args.call {
        let positional = quote_optional_str(args.args.as_deref());
        let named = quote_optional_str(args.kwargs.as_deref());
        Some(quote! {
            .call(::wired_inject::__private::parse_invocation(factory, #positional, #named)?)
        })
    } else {
        None
    };

    Ok(quote! {
        ::wired_inject::Metadata::Spec(
            ::wired_inject::Wired::new() #capability #name #context #attr #key #invocation
        )
    })
}

fn generate_field_injection(field: &InjectableField) -> TokenStream2 {
    let ident = &field.ident;
    let field_name = field_name(field);
    let default = field.default.as_ref().map(|default| match default {
        Override::Inherit => quote!(::std::default::Default::default()),
        Override::Explicit(expr) => quote!(#expr),
    });

    let injection = match (arc_inner(&field.ty), default) {
        (Some(inner), None) => quote!(kwargs.take::<#inner>(#field_name)?),
        (Some(inner), Some(default)) => {
            quote! {
                if kwargs.contains(#field_name) {
                    kwargs.take::<#inner>(#field_name)?
                } else {
                    #default
                }
            }
        }
        (None, None) => quote!(kwargs.take_data(#field_name)?),
        (None, Some(default)) => quote!(kwargs.take_data_or(#field_name, || #default)?),
    };

    quote!(#ident: #injection)
}

fn generate_service_impl(input: &InjectableInput) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let capability = match &input.capability {
        Some(capability) => quote!(#capability),
        None => quote!(Self),
    };
    let name = input.name.clone().unwrap_or_default();
    let context = input
        .context
        .as_ref()
        .map(|context| quote!(.for_context::<#context>()));

    let register = if input.reflect {
        quote!(register_reflective_injector)
    } else {
        quote!(register_injector)
    };
    let presets = input.presets.iter().map(|(name, preset)| {
        quote!(.with_preset(#name, ::wired_inject::Value::new(#preset)))
    });

    quote! {
        impl #impl_generics ::wired_inject::WiredService for #struct_name #ty_generics #where_clause {
            fn register(
                registry: &mut ::wired_inject::Registry
            ) -> ::wired_inject::Result<()> {
                registry.#register::<::wired_inject::Constructor<Self>, #capability>(
                    ::wired_inject::Injector::<::wired_inject::Constructor<Self>>::of() #(#presets)*,
                    |instance| instance as ::std::sync::Arc<#capability>,
                    ::wired_inject::Registration::named(#name) #context,
                );
                Ok(())
            }
        }
    }
}

fn field_name(field: &InjectableField) -> String {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string())
        .unwrap_or_default()
}

fn quote_optional_str(value: Option<&str>) -> TokenStream2 {
    match value {
        Some(value) => quote!(::std::option::Option::Some(#value)),
        None => quote!(::std::option::Option::None),
    }
}

/// `T` for a field typed `Arc<T>` (including `Arc<dyn Trait>`), otherwise `None`.
fn arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
