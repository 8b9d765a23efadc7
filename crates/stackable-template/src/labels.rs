//! Merging of template-wide labels into objects.
use std::collections::BTreeMap;

use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};

use crate::{
    kvp::{LabelError, Labels},
    template::{TemplateObject, TemplateResource},
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid object label"))]
    InvalidLabel { source: LabelError },

    #[snafu(display("{field} must be a map of strings"))]
    NotAStringMap { field: &'static str },

    #[snafu(display(
        "label {key:?} is already set to {existing:?}, refusing to change it to {new:?}"
    ))]
    Conflict {
        key: String,
        existing: String,
        new: String,
    },

    #[snafu(display("object must be decoded before labels can be added"))]
    Undecoded,
}

/// Adds `labels` to the labels of `object`.
///
/// Labels already present on the object are never overwritten: setting them
/// to the same value is accepted, a different value fails with
/// [`Error::Conflict`]. The object is only changed if all labels can be added.
///
/// Generic documents get the labels added to `metadata.labels` if they have a
/// `metadata` entry. Documents without one only get labels merged into an
/// already existing top-level `labels` entry, and are left alone otherwise.
pub fn add_object_labels<K: TemplateResource>(
    object: &mut TemplateObject<K>,
    labels: &BTreeMap<String, String>,
) -> Result<(), Error> {
    let labels = Labels::try_from(labels).context(InvalidLabelSnafu)?;
    if labels.is_empty() {
        return Ok(());
    }
    let labels = labels.to_unvalidated();

    match object {
        TemplateObject::Raw(_) => UndecodedSnafu.fail(),
        TemplateObject::Typed(resource) => {
            let existing = resource.metadata_mut().labels.get_or_insert_default();
            for (key, value) in &labels {
                check_conflict(key, existing.get(key).map(String::as_str), value)?;
            }
            existing.extend(labels);
            Ok(())
        }
        TemplateObject::Unstructured(document) => add_document_labels(document, labels),
    }
}

fn add_document_labels(
    document: &mut Map<String, Value>,
    labels: BTreeMap<String, String>,
) -> Result<(), Error> {
    let (existing, field) = if document.contains_key("metadata") {
        let Some(Value::Object(metadata)) = document.get_mut("metadata") else {
            return NotAStringMapSnafu { field: "metadata" }.fail();
        };
        let existing = metadata
            .entry("labels")
            .or_insert_with(|| Value::Object(Map::new()));
        (existing, "metadata.labels")
    } else {
        match document.get_mut("labels") {
            Some(existing) => (existing, "labels"),
            None => return Ok(()),
        }
    };

    let Value::Object(existing) = existing else {
        return NotAStringMapSnafu { field }.fail();
    };

    for (key, value) in &labels {
        let current = match existing.get(key) {
            None => None,
            Some(Value::String(current)) => Some(current.as_str()),
            Some(_) => return NotAStringMapSnafu { field }.fail(),
        };
        check_conflict(key, current, value)?;
    }

    existing.extend(
        labels
            .into_iter()
            .map(|(key, value)| (key, Value::String(value))),
    );
    Ok(())
}

fn check_conflict(key: &str, existing: Option<&str>, new: &str) -> Result<(), Error> {
    match existing {
        Some(existing) if existing != new => ConflictSnafu {
            key,
            existing,
            new,
        }
        .fail(),
        _ => Ok(()),
    }
}
