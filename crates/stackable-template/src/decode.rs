//! Decoding of [`RawObject`]s into generic documents.
use std::fmt::Debug;

use serde_json::{Map, Value};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::template::RawObject;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse object as JSON"))]
    ParseJson { source: serde_json::Error },

    #[snafu(display("failed to parse object as YAML"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("object must be a map, got {found}"))]
    NotAnObject { found: &'static str },

    #[snafu(display("object has no kind set"))]
    MissingKind,
}

/// Turns raw object bytes into a generic document.
pub trait ObjectDecoder: Debug + Send + Sync {
    fn decode(&self, raw: &RawObject) -> Result<Map<String, Value>, Error>;
}

/// Decodes JSON objects. Every object must carry a non-empty `kind`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonObjectDecoder;

impl ObjectDecoder for JsonObjectDecoder {
    fn decode(&self, raw: &RawObject) -> Result<Map<String, Value>, Error> {
        let document = serde_json::from_slice(&raw.raw).context(ParseJsonSnafu)?;
        into_object(document)
    }
}

/// Decodes YAML (and therefore also JSON) objects. Every object must carry a
/// non-empty `kind`.
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlObjectDecoder;

impl ObjectDecoder for YamlObjectDecoder {
    fn decode(&self, raw: &RawObject) -> Result<Map<String, Value>, Error> {
        let document = serde_yaml::from_slice(&raw.raw).context(ParseYamlSnafu)?;
        into_object(document)
    }
}

fn into_object(document: Value) -> Result<Map<String, Value>, Error> {
    let object = match document {
        Value::Object(object) => object,
        other => {
            return NotAnObjectSnafu {
                found: type_name(&other),
            }
            .fail();
        }
    };

    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .context(MissingKindSnafu)?;
    ensure!(!kind.is_empty(), MissingKindSnafu);

    Ok(object)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_object() {
        let raw = RawObject::from(r#"{"kind": "Service", "metadata": {"name": "web"}}"#);
        let object = JsonObjectDecoder.decode(&raw).unwrap();
        assert_eq!(
            Value::Object(object),
            json!({"kind": "Service", "metadata": {"name": "web"}})
        );
    }

    #[test]
    fn yaml_object() {
        let raw = RawObject::from(indoc! {"
            apiVersion: v1
            kind: ConfigMap
            data:
              answer: '42'
        "});
        let object = YamlObjectDecoder.decode(&raw).unwrap();
        assert_eq!(object["data"], json!({"answer": "42"}));
    }

    #[rstest]
    #[case::not_json("{kind: Service", "ParseJson")]
    #[case::list(r#"["kind"]"#, "NotAnObject")]
    #[case::no_kind(r#"{"metadata": {}}"#, "MissingKind")]
    #[case::empty_kind(r#"{"kind": ""}"#, "MissingKind")]
    #[case::numeric_kind(r#"{"kind": 1}"#, "MissingKind")]
    fn invalid_json(#[case] input: &str, #[case] expected: &str) {
        let err = JsonObjectDecoder
            .decode(&RawObject::from(input))
            .unwrap_err();
        let variant = match err {
            Error::ParseJson { .. } => "ParseJson",
            Error::ParseYaml { .. } => "ParseYaml",
            Error::NotAnObject { .. } => "NotAnObject",
            Error::MissingKind => "MissingKind",
        };
        assert_eq!(variant, expected);
    }

    #[test]
    fn yaml_scalar_is_not_an_object() {
        let err = YamlObjectDecoder
            .decode(&RawObject::from("just a string"))
            .unwrap_err();
        assert_eq!(err.to_string(), "object must be a map, got a string");
    }
}
