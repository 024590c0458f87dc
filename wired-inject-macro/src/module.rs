use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Attribute, ItemStruct, Path, Token,
};

struct ModuleItem {
    attrs: Vec<Attribute>,
    path: Path,
}

impl Parse for ModuleItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let path = input.parse()?;
        Ok(ModuleItem { attrs, path })
    }
}

struct ModuleArgs {
    imports: Vec<ModuleItem>,
    services: Vec<ModuleItem>,
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut imports = Vec::new();
        let mut services = Vec::new();

        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            // Parse array: [Item1, Item2, ...]
            let content;
            syn::bracketed!(content in input);
            let items = content.parse_terminated(ModuleItem::parse, Token![,])?;

            if name == "imports" {
                imports.extend(items);
            } else if name == "services" {
                services.extend(items);
            } else {
                return Err(syn::Error::new(
                    name.span(),
                    "expected `imports` or `services`",
                ));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ModuleArgs { imports, services })
    }
}

pub fn module_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ModuleArgs);
    let input = parse_macro_input!(item as ItemStruct);
    let expanded = generate_module_impl(&args, &input);

    TokenStream::from(expanded)
}

fn generate_module_impl(args: &ModuleArgs, input: &ItemStruct) -> TokenStream2 {
    let module_name = &input.ident;

    let import_registrations = args.imports.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            <#path as ::wired_inject::Module>::register(registry)?;
        }
    });

    let service_registrations = args.services.iter().map(|item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            <#path as ::wired_inject::WiredService>::register(registry)?;
        }
    });

    quote! {
        #input

        impl ::wired_inject::Module for #module_name {
            fn register(
                registry: &mut ::wired_inject::Registry
            ) -> ::wired_inject::Result<()> {
                // Imported modules first so local services replace their registrations
                #(#import_registrations)*
                #(#service_registrations)*
                Ok(())
            }
        }

        impl #module_name {
            /// Create a container holding this module's registrations
            pub fn create_container() -> ::wired_inject::Result<::wired_inject::ServiceContainer> {
                let mut registry = ::wired_inject::Registry::new();
                registry.install::<Self>()?;
                Ok(registry.create_container())
            }
        }
    }
}
