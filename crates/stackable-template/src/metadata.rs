//! Object metadata handling shared by the processing steps.
use serde_json::{Map, Value};

use crate::template::{TemplateObject, TemplateResource};

/// Removes the namespace an object declares for itself.
///
/// Typed objects get their `metadata.namespace` cleared. For generic
/// documents the `metadata` map is checked first and takes precedence over a
/// top-level `namespace` entry; only one location is ever cleared.
///
/// Returns the removed namespace, if there was one.
pub fn strip_namespace<K: TemplateResource>(object: &mut TemplateObject<K>) -> Option<String> {
    match object {
        TemplateObject::Raw(_) => None,
        TemplateObject::Typed(resource) => resource.metadata_mut().namespace.take(),
        TemplateObject::Unstructured(document) => strip_document_namespace(document),
    }
}

fn strip_document_namespace(document: &mut Map<String, Value>) -> Option<String> {
    if !document.contains_key("metadata") {
        return remove_namespace(document);
    }

    match document.get_mut("metadata") {
        Some(Value::Object(metadata)) => remove_namespace(metadata),
        // A metadata entry of any other shape still shadows the top level
        _ => None,
    }
}

fn remove_namespace(map: &mut Map<String, Value>) -> Option<String> {
    match map.remove("namespace")? {
        Value::String(namespace) => Some(namespace),
        other => Some(other.to_string()),
    }
}
