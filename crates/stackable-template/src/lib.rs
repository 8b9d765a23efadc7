//! Parameterization of Kubernetes object templates.
//!
//! A [`Template`] bundles a list of objects with a list of named
//! [`Parameter`]s. The [`Processor`] resolves every parameter (using an
//! explicit value, or a [`Generator`](generator::Generator) such as the
//! [`ExpressionValueGenerator`](generator::expression::ExpressionValueGenerator)),
//! replaces `${PARAMETER_NAME}` tokens in every string reachable from the
//! template objects, strips the objects' namespaces and merges the template's
//! object labels into them.
//!
//! ```
//! use stackable_template::{
//!     Parameter, Processor, Template, TemplateObject, generator::GeneratorRegistry,
//! };
//!
//! let mut template = Template::<kube::core::DynamicObject>::default();
//! template.add_parameter(Parameter {
//!     name: "USERNAME".to_owned(),
//!     value: "admin".to_owned(),
//!     ..Default::default()
//! });
//! template.objects.push(TemplateObject::raw(
//!     r#"{"kind": "ConfigMap", "data": {"user": "${USERNAME}"}}"#,
//! ));
//!
//! let processor = Processor::new(GeneratorRegistry::with_defaults());
//! let template = processor.process(&template).into_result().unwrap();
//!
//! let TemplateObject::Unstructured(object) = &template.objects[0] else {
//!     panic!("raw objects are decoded into unstructured documents");
//! };
//! assert_eq!(object["data"]["user"], "admin");
//! ```

pub mod decode;
pub mod field;
pub mod generator;
pub mod kvp;
pub mod labels;
pub mod metadata;
pub mod processor;
pub mod template;
pub mod visit;

pub use processor::{Processed, Processor};
pub use template::{Parameter, RawObject, Template, TemplateObject, TemplateResource};
pub use visit::VisitStrings;

// External re-exports
pub use k8s_openapi;
pub use kube;
