//! The template data model.
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::visit::VisitStrings;

/// A named value which can be substituted into template objects using
/// `${NAME}` tokens.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Unique name of the parameter within a template.
    pub name: String,

    /// Human readable name of the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The value of the parameter. An empty value is considered unresolved.
    #[serde(default)]
    pub value: String,

    /// Name of the generation strategy used to create a value when none is
    /// provided, such as `expression`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<String>,

    /// Input of the generation strategy, such as `[a-zA-Z0-9]{8}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Whether the template is invalid when the parameter has no value after
    /// generation.
    #[serde(default)]
    pub required: bool,
}

impl Parameter {
    /// Returns the generation strategy, treating an empty name as none.
    pub fn generator(&self) -> Option<&str> {
        self.generate.as_deref().filter(|name| !name.is_empty())
    }
}

/// Object bytes which have not been decoded yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawObject {
    pub raw: Vec<u8>,
}

impl From<Vec<u8>> for RawObject {
    fn from(raw: Vec<u8>) -> Self {
        Self { raw }
    }
}

impl From<&str> for RawObject {
    fn from(raw: &str) -> Self {
        Self {
            raw: raw.as_bytes().to_vec(),
        }
    }
}

/// A statically typed object which can be part of a template.
///
/// Implemented for [`DynamicObject`] and the common `k8s-openapi` kinds (see
/// [`crate::visit`]). Custom types derive
/// [`VisitStrings`](derive@crate::visit::VisitStrings) and implement
/// [`TemplateResource::metadata_mut`] by hand.
pub trait TemplateResource: VisitStrings + Clone {
    fn metadata_mut(&mut self) -> &mut ObjectMeta;
}

/// One object of a template.
#[derive(Clone, Debug, PartialEq, VisitStrings)]
#[visit_strings(bound = "K: VisitStrings", path_overrides(visit = "crate::visit"))]
pub enum TemplateObject<K = DynamicObject> {
    /// An object which still needs to be decoded into an
    /// [`Unstructured`](TemplateObject::Unstructured) document. Its bytes are
    /// never visited.
    Raw(#[visit_strings(skip)] RawObject),

    /// A generic document without a fixed schema.
    Unstructured(Map<String, Value>),

    /// A statically typed object.
    Typed(K),
}

impl<K> TemplateObject<K> {
    pub fn raw(raw: impl Into<RawObject>) -> Self {
        Self::Raw(raw.into())
    }

    /// Wraps a JSON value as an unstructured document. Returns [`None`] if the
    /// value is not a JSON object.
    pub fn unstructured(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Unstructured(map)),
            _ => None,
        }
    }
}

/// A set of objects together with the parameters substituted into them.
#[derive(Clone, Debug, PartialEq)]
pub struct Template<K = DynamicObject> {
    /// Metadata of the template itself.
    pub metadata: ObjectMeta,

    /// Message shown after the template has been instantiated. Parameter
    /// tokens are substituted into it as well.
    pub message: Option<String>,

    pub parameters: Vec<Parameter>,

    pub objects: Vec<TemplateObject<K>>,

    /// Labels added to every object of the template.
    pub object_labels: BTreeMap<String, String>,
}

impl<K> Default for Template<K> {
    fn default() -> Self {
        Self {
            metadata: ObjectMeta::default(),
            message: None,
            parameters: Vec::new(),
            objects: Vec::new(),
            object_labels: BTreeMap::new(),
        }
    }
}

impl<K> Template<K> {
    /// Adds a parameter to the template. A parameter with the same name is
    /// replaced in place.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        match self.parameter_mut(&parameter.name) {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
    }

    /// Looks up a parameter by its name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|parameter| parameter.name == name)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn parameter(name: &str, value: &str) -> Parameter {
        Parameter {
            name: name.to_owned(),
            value: value.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn add_parameter_replaces_existing() {
        let mut template = Template::<DynamicObject>::default();
        template.add_parameter(parameter("A", "1"));
        template.add_parameter(parameter("B", "2"));
        template.add_parameter(parameter("A", "3"));

        assert_eq!(template.parameters.len(), 2);
        assert_eq!(template.parameters[0], parameter("A", "3"));
        assert_eq!(
            template.parameter("B").map(|p| p.value.as_str()),
            Some("2")
        );
        assert!(template.parameter("C").is_none());
    }

    #[test]
    fn deserialize_parameter() {
        let parameter: Parameter = serde_yaml::from_str(indoc! {"
            name: MYSQL_PASSWORD
            displayName: MySQL Password
            generate: expression
            from: '[a-zA-Z0-9]{16}'
            required: true
        "})
        .unwrap();

        assert_eq!(parameter.name, "MYSQL_PASSWORD");
        assert_eq!(parameter.display_name.as_deref(), Some("MySQL Password"));
        assert_eq!(parameter.value, "");
        assert_eq!(parameter.generator(), Some("expression"));
        assert_eq!(parameter.from.as_deref(), Some("[a-zA-Z0-9]{16}"));
        assert!(parameter.required);
    }

    #[test]
    fn empty_generator_name_is_none() {
        let parameter = Parameter {
            generate: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(parameter.generator(), None);
    }

    #[test]
    fn unstructured_requires_object() {
        let list = serde_json::json!([1, 2]);
        assert_eq!(TemplateObject::<DynamicObject>::unstructured(list), None);
        assert!(matches!(
            TemplateObject::<DynamicObject>::unstructured(serde_json::json!({"kind": "Pod"})),
            Some(TemplateObject::Unstructured(_))
        ));
    }
}
