use darling::{
    FromDeriveInput, FromField, FromMeta, FromVariant,
    ast::{Data, Fields},
};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{DeriveInput, Generics, Path, WherePredicate, parse_quote};

#[derive(FromMeta)]
struct PathOverrides {
    #[darling(default = "PathOverrides::default_visit")]
    visit: Path,
}

impl Default for PathOverrides {
    fn default() -> Self {
        Self {
            visit: Self::default_visit(),
        }
    }
}

impl PathOverrides {
    fn default_visit() -> Path {
        parse_quote!(::stackable_template::visit)
    }
}

#[derive(FromDeriveInput)]
#[darling(attributes(visit_strings))]
struct VisitStringsInput {
    ident: Ident,
    generics: Generics,
    data: Data<VisitStringsVariant, VisitStringsField>,
    #[darling(default)]
    path_overrides: PathOverrides,
    #[darling(default)]
    bound: Option<Vec<WherePredicate>>,
}

#[derive(FromField)]
#[darling(attributes(visit_strings))]
struct VisitStringsField {
    ident: Option<Ident>,
    #[darling(default)]
    skip: bool,
}

#[derive(FromVariant)]
struct VisitStringsVariant {
    ident: Ident,
    fields: Fields<VisitStringsField>,
}

pub fn derive(input: DeriveInput) -> TokenStream {
    let VisitStringsInput {
        ident,
        mut generics,
        data,
        path_overrides: PathOverrides { visit: visit_mod },
        bound,
    } = match VisitStringsInput::from_derive_input(&input) {
        Ok(input) => input,
        Err(err) => return err.write_errors(),
    };

    // A struct is matched like an enum with a single variant whose path is the struct itself
    let variants: Vec<(Path, Fields<VisitStringsField>)> = match data {
        Data::Struct(fields) => vec![(parse_quote! { #ident }, fields)],
        Data::Enum(variants) => variants
            .into_iter()
            .map(
                |VisitStringsVariant {
                     ident: variant_ident,
                     fields,
                 }| (parse_quote! { #ident::#variant_ident }, fields),
            )
            .collect(),
    };

    let match_arms = variants
        .into_iter()
        .map(|(constructor, fields)| {
            let bindings = fields
                .iter()
                .enumerate()
                .map(|(index, field)| {
                    let member = match &field.ident {
                        Some(field_ident) => quote! { #field_ident },
                        None => {
                            let index = syn::Index::from(index);
                            quote! { #index }
                        }
                    };
                    if field.skip {
                        quote! { #member: _, }
                    } else {
                        let binding = binding_ident(field.ident.as_ref(), index);
                        quote! { #member: #binding, }
                    }
                })
                .collect::<TokenStream>();
            let body = fields
                .iter()
                .enumerate()
                .filter(|(_, field)| !field.skip)
                .map(|(index, field)| {
                    let binding = binding_ident(field.ident.as_ref(), index);
                    quote! {
                        #visit_mod::VisitStrings::visit_strings(#binding, rewrite);
                    }
                })
                .collect::<TokenStream>();
            quote! {
                #constructor { #bindings } => { #body }
            }
        })
        .collect::<TokenStream>();

    if let Some(bound) = bound {
        let where_clause = generics.make_where_clause();
        where_clause.predicates.extend(bound);
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics #visit_mod::VisitStrings for #ident #ty_generics #where_clause {
            #[allow(unused_variables, unreachable_patterns)]
            fn visit_strings(
                &mut self,
                rewrite: &mut dyn ::core::ops::FnMut(&str) -> ::std::string::String,
            ) {
                match self {
                    #match_arms
                    _ => {}
                }
            }
        }
    }
}

fn binding_ident(ident: Option<&Ident>, index: usize) -> Ident {
    match ident {
        Some(ident) => format_ident!("field_{ident}"),
        None => format_ident!("field_{index}"),
    }
}
