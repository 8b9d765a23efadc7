use std::{fmt::Display, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{ResultExt, Snafu, ensure};

const KEY_PREFIX_MAX_LEN: usize = 253;
const KEY_NAME_MAX_LEN: usize = 63;

static KEY_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)*$")
        .expect("failed to compile key prefix regex")
});

static KEY_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9A-Z]([a-z0-9A-Z-_.]*[a-z0-9A-Z]+)?$")
        .expect("failed to compile key name regex")
});

/// The error type for label key parsing/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum KeyError {
    #[snafu(display("key input cannot be empty"))]
    EmptyInput,

    /// Keys like `app.kubernetes.io/nested/name` contain more than one slash.
    #[snafu(display("key prefixes cannot be nested, only use a single slash"))]
    NestedPrefix,

    #[snafu(display("failed to parse key prefix"))]
    InvalidPrefix { source: KeySegmentError },

    #[snafu(display("failed to parse key name"))]
    InvalidName { source: KeySegmentError },
}

/// The error type for a single segment (prefix or name) of a key.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum KeySegmentError {
    #[snafu(display("segment cannot be empty"))]
    SegmentEmpty,

    #[snafu(display(
        "segment exceeds the maximum length - expected {max_length} characters or less, got {length}"
    ))]
    SegmentTooLong { length: usize, max_length: usize },

    #[snafu(display("segment contains non-ascii characters"))]
    SegmentNotAscii,

    #[snafu(display("segment violates kubernetes format"))]
    SegmentInvalid,
}

/// A validated Kubernetes label key of the form `(<PREFIX>/)<NAME>`.
///
/// See <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/>.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key {
    prefix: Option<String>,
    name: String,
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), EmptyInputSnafu);

        let (prefix, name) = match input.split('/').collect::<Vec<_>>()[..] {
            [name] => (None, name),
            [prefix, name] => (Some(prefix), name),
            _ => return NestedPrefixSnafu.fail(),
        };

        if let Some(prefix) = prefix {
            validate_segment(prefix, KEY_PREFIX_MAX_LEN, &KEY_PREFIX_REGEX)
                .context(InvalidPrefixSnafu)?;
        }
        validate_segment(name, KEY_NAME_MAX_LEN, &KEY_NAME_REGEX)
            .context(InvalidNameSnafu)?;

        Ok(Self {
            prefix: prefix.map(ToOwned::to_owned),
            name: name.to_owned(),
        })
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Key {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_segment(input: &str, max_length: usize, regex: &Regex) -> Result<(), KeySegmentError> {
    ensure!(!input.is_empty(), SegmentEmptySnafu);
    ensure!(
        input.len() <= max_length,
        SegmentTooLongSnafu {
            length: input.len(),
            max_length
        }
    );
    ensure!(input.is_ascii(), SegmentNotAsciiSnafu);
    ensure!(regex.is_match(input), SegmentInvalidSnafu);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("app.kubernetes.io/name", Some("app.kubernetes.io"), "name")]
    #[case("template", None, "template")]
    #[case(
        "template.openshift.io/template-instance",
        Some("template.openshift.io"),
        "template-instance"
    )]
    fn valid_key(#[case] input: &str, #[case] prefix: Option<&str>, #[case] name: &str) {
        let key = Key::from_str(input).unwrap();
        assert_eq!(key.prefix(), prefix);
        assert_eq!(key.name(), name);
        assert_eq!(key.to_string(), input);
    }

    #[rstest]
    #[case("", KeyError::EmptyInput)]
    #[case("a/b/c", KeyError::NestedPrefix)]
    #[case("/name", KeyError::InvalidPrefix { source: KeySegmentError::SegmentEmpty })]
    #[case("prefix/", KeyError::InvalidName { source: KeySegmentError::SegmentEmpty })]
    #[case("näme", KeyError::InvalidName { source: KeySegmentError::SegmentNotAscii })]
    #[case("-name", KeyError::InvalidName { source: KeySegmentError::SegmentInvalid })]
    fn invalid_key(#[case] input: &str, #[case] error: KeyError) {
        assert_eq!(Key::from_str(input).unwrap_err(), error);
    }

    #[test]
    fn name_too_long() {
        let err = Key::from_str(&"a".repeat(64)).unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidName {
                source: KeySegmentError::SegmentTooLong {
                    length: 64,
                    max_length: KEY_NAME_MAX_LEN
                }
            }
        );
    }
}
