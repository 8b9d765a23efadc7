//! Generation of parameter values.
//!
//! Parameters which have no value but name a generation strategy in their
//! `generate` field get a value from the [`Generator`] registered under that
//! name in the [`GeneratorRegistry`] handed to the
//! [`Processor`](crate::Processor).
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub mod expression;

use expression::{ExpressionValueGenerator, ParseError};

/// The strategy name of the [`ExpressionValueGenerator`] in
/// [`GeneratorRegistry::with_defaults`].
pub const EXPRESSION_GENERATOR: &str = "expression";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("malformed expression {expression:?}"))]
    MalformedExpression {
        source: ParseError,
        expression: String,
    },

    #[snafu(display("value generation failed"))]
    Failed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A strategy producing values for template parameters.
///
/// The value is returned as JSON so that third-party strategies can be
/// plugged in without knowing how the value is used. The
/// [`Processor`](crate::Processor) only accepts string values.
pub trait Generator: Debug + Send + Sync {
    /// Generates a value from the parameter's `from` expression.
    fn generate_value(&self, expression: &str) -> Result<serde_json::Value, Error>;
}

/// The set of generation strategies known to a processor, by name.
///
/// A name can be registered without a generator (see
/// [`GeneratorRegistry::reserve`]); parameters asking for such a strategy
/// fail instead of being reported as using an unknown strategy.
#[derive(Clone, Debug, Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Option<Arc<dyn Generator>>>,
}

impl GeneratorRegistry {
    /// Creates a registry without any strategies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing the built-in `expression` strategy.
    pub fn with_defaults() -> Self {
        Self::new().with_generator(EXPRESSION_GENERATOR, ExpressionValueGenerator::new())
    }

    pub fn with_generator(
        mut self,
        name: impl Into<String>,
        generator: impl Generator + 'static,
    ) -> Self {
        self.register(name, generator);
        self
    }

    /// Registers (or replaces) the strategy called `name`.
    pub fn register(&mut self, name: impl Into<String>, generator: impl Generator + 'static) {
        self.generators
            .insert(name.into(), Some(Arc::new(generator)));
    }

    /// Records `name` as a known strategy without a generator behind it.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.generators.insert(name.into(), None);
    }

    /// Looks up a strategy. The outer [`Option`] tells whether the name is
    /// known, the inner one whether a generator is configured for it.
    pub fn get(&self, name: &str) -> Option<Option<&Arc<dyn Generator>>> {
        self.generators.get(name).map(Option::as_ref)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    /// Builds a registry from a [`GeneratorsConfig`].
    pub fn from_config(config: &GeneratorsConfig) -> Self {
        let mut registry = Self::new();
        for (name, generator) in &config.generators {
            match generator {
                GeneratorConfig::Expression { seed: Some(seed) } => {
                    registry.register(name, ExpressionValueGenerator::with_seed(*seed));
                }
                GeneratorConfig::Expression { seed: None } => {
                    registry.register(name, ExpressionValueGenerator::new());
                }
                GeneratorConfig::Disabled => registry.reserve(name),
            }
        }
        registry
    }
}

/// Configuration of a single generation strategy.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GeneratorConfig {
    /// An [`ExpressionValueGenerator`], optionally with a fixed seed.
    Expression {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },

    /// The strategy name is known but must not be used.
    Disabled,
}

/// Serializable description of a [`GeneratorRegistry`].
///
/// ```
/// # use stackable_template::generator::{GeneratorsConfig, GeneratorRegistry};
/// let config = GeneratorsConfig::from_yaml_str(
///     "
/// generators:
///   expression:
///     kind: expression
///   legacy:
///     kind: disabled
/// ",
/// )
/// .unwrap();
/// let registry = GeneratorRegistry::from_config(&config);
/// assert_eq!(registry.names().collect::<Vec<_>>(), ["expression", "legacy"]);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GeneratorsConfig {
    #[serde(default)]
    pub generators: BTreeMap<String, GeneratorConfig>,
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("failed to parse generator configuration"))]
    ParseConfig { source: serde_yaml::Error },
}

impl GeneratorsConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(input).context(ParseConfigSnafu)
    }
}
