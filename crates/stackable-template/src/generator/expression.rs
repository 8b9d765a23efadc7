//! A compact pattern language for generating random parameter values.
//!
//! | expression       | example value |
//! |------------------|---------------|
//! | `test[0-9]{1}x`  | `test7x`      |
//! | `[0-1]{8}`       | `01001100`    |
//! | `0x[A-F0-9]{4}`  | `0xB3AF`      |
//! | `[a-zA-Z0-9]{8}` | `hW4yQU5i`    |
//! | `[\w]{12}`       | `Ab3_kq9Lz0Xc`|
//!
//! Besides ranges and single characters, a class may contain the named
//! classes `\w` (letters, digits and `_`), `\d` (digits), `\a` (letters and
//! digits) and `\A` (ASCII symbols).
use std::{
    fmt::Debug,
    str::FromStr,
    sync::{Mutex, PoisonError},
};

use indexmap::IndexSet;
use rand::{Rng, SeedableRng, rngs::StdRng};
use snafu::{ResultExt, Snafu, ensure};

use crate::generator::{Error, Generator, MalformedExpressionSnafu};

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERALS: &str = "0123456789";
const SYMBOLS: &str = "~!@#$%^&*()-_+={}[]\\|<,>.?/\"';:`";

/// Upper bound for the quantifier of a class, `[a-z]{255}` is the longest
/// run a single class can produce.
pub const MAX_QUANTIFIER: usize = 255;

/// The error type for expression parsing. Every variant carries the fragment
/// of the expression that could not be parsed.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseError {
    #[snafu(display("character class {fragment:?} is never closed"))]
    UnclosedClass { fragment: String },

    #[snafu(display("unexpected {fragment:?} without an opening counterpart"))]
    UnexpectedClassEnd { fragment: String },

    #[snafu(display("character class {fragment:?} is empty"))]
    EmptyClass { fragment: String },

    #[snafu(display("range {fragment:?} is out of order"))]
    InvalidRange { fragment: String },

    #[snafu(display("quantifier {fragment:?} does not follow a character class"))]
    DanglingQuantifier { fragment: String },

    #[snafu(display("quantifier {fragment:?} is never closed"))]
    UnclosedQuantifier { fragment: String },

    #[snafu(display("quantifier {fragment:?} is not a positive number"))]
    InvalidQuantifier { fragment: String },

    #[snafu(display(
        "quantifier {fragment:?} must be within [1-{MAX_QUANTIFIER}] characters"
    ))]
    QuantifierOutOfRange { fragment: String },

    #[snafu(display("expression ends with an unfinished escape {fragment:?}"))]
    TrailingEscape { fragment: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Class { alphabet: Vec<char>, count: usize },
}

/// A parsed generation expression.
///
/// Parsing happens up front so that a malformed expression is rejected
/// before any random character is drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    segments: Vec<Segment>,
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let chars = input.char_indices().collect::<Vec<_>>();
        let fragment = |start: usize, end: usize| -> String {
            let from = chars.get(start).map_or(input.len(), |(offset, _)| *offset);
            let to = chars.get(end).map_or(input.len(), |(offset, _)| *offset);
            input[from..to].to_owned()
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos].1 {
                '\\' => {
                    let (_, escaped) = *chars
                        .get(pos + 1)
                        .ok_or_else(|| TrailingEscapeSnafu {
                            fragment: fragment(pos, pos + 1),
                        }
                        .build())?;
                    literal.push(escaped);
                    pos += 2;
                }
                '[' => {
                    let class_start = pos;
                    let class_end = find_class_end(&chars, class_start).ok_or_else(|| {
                        UnclosedClassSnafu {
                            fragment: fragment(class_start, chars.len()),
                        }
                        .build()
                    })?;
                    let alphabet = parse_class(&chars[class_start + 1..class_end], || {
                        fragment(class_start, class_end + 1)
                    })?;
                    pos = class_end + 1;

                    let count = if chars.get(pos).is_some_and(|(_, c)| *c == '{') {
                        let quantifier_start = pos;
                        let quantifier_end = (pos + 1..chars.len())
                            .find(|&i| chars[i].1 == '}')
                            .ok_or_else(|| UnclosedQuantifierSnafu {
                                fragment: fragment(quantifier_start, chars.len()),
                            }
                            .build())?;
                        pos = quantifier_end + 1;
                        parse_quantifier(&fragment(quantifier_start, quantifier_end + 1))?
                    } else {
                        1
                    };

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Class { alphabet, count });
                }
                ']' | '}' => {
                    return UnexpectedClassEndSnafu {
                        fragment: fragment(pos, pos + 1),
                    }
                    .fail();
                }
                '{' => {
                    let end = (pos + 1..chars.len())
                        .find(|&i| chars[i].1 == '}')
                        .map_or(chars.len(), |i| i + 1);
                    return DanglingQuantifierSnafu {
                        fragment: fragment(pos, end),
                    }
                    .fail();
                }
                c => {
                    literal.push(c);
                    pos += 1;
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }
}

impl Expression {
    /// Produces a new random value matching this expression.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> String {
        let mut value = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => value.push_str(literal),
                Segment::Class { alphabet, count } => {
                    value.extend(
                        (0..*count).map(|_| alphabet[rng.random_range(0..alphabet.len())]),
                    );
                }
            }
        }
        value
    }
}

/// Finds the `]` closing the class opened at `start`, skipping escaped
/// characters.
fn find_class_end(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let mut pos = start + 1;
    while let Some((_, c)) = chars.get(pos) {
        match c {
            '\\' => pos += 2,
            ']' => return Some(pos),
            _ => pos += 1,
        }
    }
    None
}

/// Resolves the content of a `[...]` group into its alphabet.
fn parse_class(
    content: &[(usize, char)],
    fragment: impl Fn() -> String,
) -> Result<Vec<char>, ParseError> {
    let mut alphabet = IndexSet::new();
    let mut pos = 0;

    while pos < content.len() {
        let c = content[pos].1;
        if c == '\\' {
            // find_class_end never stops right after a backslash
            let escaped = content.get(pos + 1).map_or('\\', |(_, c)| *c);
            match escaped {
                'w' => alphabet.extend(ALPHABET.chars().chain(NUMERALS.chars()).chain(['_'])),
                'd' => alphabet.extend(NUMERALS.chars()),
                'a' => alphabet.extend(ALPHABET.chars().chain(NUMERALS.chars())),
                'A' => alphabet.extend(SYMBOLS.chars()),
                other => {
                    alphabet.insert(other);
                }
            }
            pos += 2;
        } else if pos + 2 < content.len() && content[pos + 1].1 == '-' {
            let (end, width) = match content[pos + 2].1 {
                '\\' => {
                    let escaped = content.get(pos + 3).map_or('\\', |(_, c)| *c);
                    // Named classes cannot bound a range
                    ensure!(
                        !matches!(escaped, 'w' | 'd' | 'a' | 'A'),
                        InvalidRangeSnafu {
                            fragment: format!("{c}-\\{escaped}"),
                        }
                    );
                    (escaped, 4)
                }
                end => (end, 3),
            };
            ensure!(
                c <= end,
                InvalidRangeSnafu {
                    fragment: format!("{c}-{end}"),
                }
            );
            alphabet.extend(c..=end);
            pos += width;
        } else {
            alphabet.insert(c);
            pos += 1;
        }
    }

    ensure!(
        !alphabet.is_empty(),
        EmptyClassSnafu {
            fragment: fragment()
        }
    );
    Ok(alphabet.into_iter().collect())
}

/// Parses a `{n}` quantifier (braces included).
fn parse_quantifier(fragment: &str) -> Result<usize, ParseError> {
    let digits = &fragment[1..fragment.len() - 1];
    ensure!(
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        InvalidQuantifierSnafu { fragment }
    );
    let count = digits
        .parse::<usize>()
        .ok()
        .filter(|count| (1..=MAX_QUANTIFIER).contains(count));
    count.ok_or_else(|| QuantifierOutOfRangeSnafu { fragment }.build())
}

/// Generates random strings from [`Expression`]s.
///
/// All draws share one random number generator guarded by a mutex, which
/// makes a single generator safe to share between threads.
pub struct ExpressionValueGenerator {
    rng: Mutex<StdRng>,
}

impl Debug for ExpressionValueGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionValueGenerator").finish_non_exhaustive()
    }
}

impl Default for ExpressionValueGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionValueGenerator {
    /// Creates a generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates a generator with a fixed seed, producing the same sequence
    /// of values on every run.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, expression: &str) -> Result<String, Error> {
        let parsed = Expression::from_str(expression)
            .context(MalformedExpressionSnafu { expression })?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(parsed.generate(&mut *rng))
    }
}

impl Generator for ExpressionValueGenerator {
    fn generate_value(&self, expression: &str) -> Result<serde_json::Value, Error> {
        self.generate(expression).map(serde_json::Value::String)
    }
}
