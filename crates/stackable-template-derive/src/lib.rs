use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod visit_strings;

/// Derives `VisitStrings` for a struct or enum by visiting every field in
/// declaration order.
///
/// Supported attributes:
///
/// - `#[visit_strings(skip)]` on a field leaves it untouched.
/// - `#[visit_strings(bound = "T: VisitStrings")]` on the container adds
///   predicates to the where-clause of the generated implementation. No
///   bounds are inferred for generic parameters.
/// - `#[visit_strings(path_overrides(visit = "..."))]` on the container
///   changes where the `VisitStrings` trait is looked up (defaults to
///   `::stackable_template::visit`).
#[proc_macro_derive(VisitStrings, attributes(visit_strings))]
pub fn derive_visit_strings(input: TokenStream) -> TokenStream {
    visit_strings::derive(parse_macro_input!(input as DeriveInput)).into()
}
