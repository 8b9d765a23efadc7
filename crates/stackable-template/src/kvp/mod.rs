//! Validated Kubernetes labels.
//!
//! Template authors hand in object labels as plain strings. Before they are
//! merged into objects, they are parsed into [`Labels`] so that a template
//! never produces objects the API server would reject because of their
//! labels.
use std::{
    collections::BTreeMap,
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use snafu::{ResultExt, Snafu, ensure};

mod key;

pub use key::{Key, KeyError, KeySegmentError};

const LABEL_VALUE_MAX_LEN: usize = 63;

static LABEL_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9A-Z]([a-z0-9A-Z-_.]*[a-z0-9A-Z]+)?$")
        .expect("failed to compile label value regex")
});

/// The error type for label value parse/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum LabelValueError {
    #[snafu(display(
        "value exceeds the maximum length - expected 63 characters or less, got {length}"
    ))]
    ValueTooLong { length: usize },

    #[snafu(display("value contains non-ascii characters"))]
    ValueNotAscii,

    #[snafu(display("value violates kubernetes format"))]
    ValueInvalid,
}

/// The error type for label parsing.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum LabelError {
    #[snafu(display("failed to parse key {key:?} of label"))]
    InvalidKey { source: KeyError, key: String },

    #[snafu(display("failed to parse value {value:?} of label {key:?}"))]
    InvalidValue {
        source: LabelValueError,
        key: String,
        value: String,
    },
}

/// A validated Kubernetes label value. It may be empty.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelValue(String);

impl FromStr for LabelValue {
    type Err = LabelValueError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(
            input.len() <= LABEL_VALUE_MAX_LEN,
            ValueTooLongSnafu {
                length: input.len()
            }
        );
        ensure!(input.is_ascii(), ValueNotAsciiSnafu);
        ensure!(
            input.is_empty() || LABEL_VALUE_REGEX.is_match(input),
            ValueInvalidSnafu
        );

        Ok(Self(input.to_owned()))
    }
}

impl Deref for LabelValue {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated label.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Label {
    pub key: Key,
    pub value: LabelValue,
}

impl TryFrom<(&str, &str)> for Label {
    type Error = LabelError;

    fn try_from((key, value): (&str, &str)) -> Result<Self, Self::Error> {
        let parsed_key = Key::from_str(key).context(InvalidKeySnafu { key })?;
        let value = LabelValue::from_str(value).context(InvalidValueSnafu { key, value })?;
        Ok(Self {
            key: parsed_key,
            value,
        })
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A validated set of labels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels(BTreeMap<Key, LabelValue>);

impl Labels {
    /// Parses every `(key, value)` pair, failing on the first invalid one.
    pub fn try_from_iter<'a>(
        iter: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, LabelError> {
        iter.into_iter()
            .map(|pair| Label::try_from(pair).map(|label| (label.key, label.value)))
            .collect::<Result<_, _>>()
            .map(Self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &LabelValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clones the labels into plain strings, as stored in object metadata.
    pub fn to_unvalidated(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }
}

impl<'a> TryFrom<&'a BTreeMap<String, String>> for Labels {
    type Error = LabelError;

    fn try_from(map: &'a BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::try_from_iter(map.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}
