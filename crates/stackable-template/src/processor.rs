//! Instantiation of templates.
//!
//! The [`Processor`] turns a [`Template`] into its instantiated form in three
//! steps:
//!
//! 1. [`Processor::generate_parameter_values`] resolves every parameter
//!    without a value using the configured [`GeneratorRegistry`].
//! 2. [`Processor::substitute_parameters`] replaces the `${NAME}` tokens in
//!    every object.
//! 3. The namespace of each object is stripped and the template's object
//!    labels are merged into it.
//!
//! Failures of the first step are fatal. Failures of individual objects are
//! collected, so that a single [`Processor::process`] call reports the
//! problems of all objects.
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    sync::LazyLock,
};

use kube::core::DynamicObject;
use regex::{Captures, Regex};
use serde_json::Value;
use snafu::{ResultExt, Snafu, ensure};
use strum::{EnumDiscriminants, IntoStaticStr};
use tracing::{debug, instrument, warn};

use crate::{
    decode::{self, JsonObjectDecoder, ObjectDecoder},
    field::FieldPath,
    generator::{self, GeneratorRegistry},
    labels, metadata,
    template::{Parameter, Template, TemplateObject, TemplateResource},
    visit::{VisitStrings, visit_object_strings},
};

static PARAMETER_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z0-9_]+)\}").expect("failed to compile parameter token regex")
});

#[derive(Debug, Snafu, EnumDiscriminants)]
#[strum_discriminants(name(ErrorKind), derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display(
        "{path}: unknown generator {generator:?} requested by parameter {parameter:?}"
    ))]
    UnknownGenerator {
        path: FieldPath,
        parameter: String,
        generator: String,
    },

    #[snafu(display(
        "{path}: generator {generator:?} requested by parameter {parameter:?} is not configured"
    ))]
    InvalidGeneratorConfiguration {
        path: FieldPath,
        parameter: String,
        generator: String,
    },

    #[snafu(display("{path}: failed to generate value for parameter {parameter:?}"))]
    GenerationFailed {
        source: generator::Error,
        path: FieldPath,
        parameter: String,
    },

    #[snafu(display(
        "{path}: generator {generator:?} returned {found} instead of a string for parameter {parameter:?}"
    ))]
    InvalidGeneratedType {
        path: FieldPath,
        parameter: String,
        generator: String,
        found: &'static str,
    },

    #[snafu(display("{path}: parameter {parameter:?} is required and has no value"))]
    MissingRequiredParameter { path: FieldPath, parameter: String },

    #[snafu(display("{path}: failed to decode object"))]
    ObjectDecodeFailed {
        source: decode::Error,
        path: FieldPath,
    },

    #[snafu(display("{path}: failed to add object labels"))]
    LabelApplicationFailed {
        source: labels::Error,
        path: FieldPath,
    },
}

impl Error {
    /// The part of the template this error belongs to.
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::UnknownGenerator { path, .. }
            | Self::InvalidGeneratorConfiguration { path, .. }
            | Self::GenerationFailed { path, .. }
            | Self::InvalidGeneratedType { path, .. }
            | Self::MissingRequiredParameter { path, .. }
            | Self::ObjectDecodeFailed { path, .. }
            | Self::LabelApplicationFailed { path, .. } => path,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from(self)
    }
}

/// All errors collected while processing a template.
#[derive(Debug, Default)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Error> {
        self.0
    }
}

impl From<Vec<Error>> for Errors {
    fn from(errors: Vec<Error>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for Errors {
    type IntoIter = std::vec::IntoIter<Error>;
    type Item = Error;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type IntoIter = std::slice::Iter<'a, Error>;
    type Item = &'a Error;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

/// The outcome of [`Processor::process`].
///
/// The template is returned even if errors occurred. Objects which failed to
/// process are kept in the form they had in the input template.
#[derive(Debug)]
pub struct Processed<K = DynamicObject> {
    pub template: Template<K>,
    pub errors: Errors,
}

impl<K> Processed<K> {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the processed template if no errors occurred.
    pub fn into_result(self) -> Result<Template<K>, Errors> {
        if self.errors.is_empty() {
            Ok(self.template)
        } else {
            Err(self.errors)
        }
    }
}

/// Instantiates templates.
#[derive(Debug)]
pub struct Processor {
    generators: GeneratorRegistry,
    decoder: Box<dyn ObjectDecoder>,
}

impl Processor {
    /// Creates a processor using `generators` to resolve parameter values.
    /// Raw objects are decoded as JSON, see [`Processor::with_object_decoder`].
    pub fn new(generators: GeneratorRegistry) -> Self {
        Self {
            generators,
            decoder: Box::new(JsonObjectDecoder),
        }
    }

    pub fn with_object_decoder(mut self, decoder: impl ObjectDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Resolves the values of all parameters in template order.
    ///
    /// Parameters which already have a value are left alone. Parameters
    /// naming a generator get their value generated from their `from`
    /// expression. Returns on the first parameter which cannot be resolved,
    /// including required parameters which are still empty.
    #[instrument(skip_all, fields(parameters = template.parameters.len()))]
    pub fn generate_parameter_values<K>(&self, template: &mut Template<K>) -> Result<(), Error> {
        let parameters_path = FieldPath::new("template").child("parameters");

        for (index, parameter) in template.parameters.iter_mut().enumerate() {
            let path = parameters_path.index(index);
            if !parameter.value.is_empty() {
                continue;
            }

            if let Some(generator_name) = parameter.generator() {
                let generator = match self.generators.get(generator_name) {
                    Some(Some(generator)) => generator,
                    Some(None) => {
                        return InvalidGeneratorConfigurationSnafu {
                            path,
                            parameter: &parameter.name,
                            generator: generator_name,
                        }
                        .fail();
                    }
                    None => {
                        return UnknownGeneratorSnafu {
                            path,
                            parameter: &parameter.name,
                            generator: generator_name,
                        }
                        .fail();
                    }
                };

                let value = generator
                    .generate_value(parameter.from.as_deref().unwrap_or_default())
                    .context(GenerationFailedSnafu {
                        path: path.clone(),
                        parameter: &parameter.name,
                    })?;
                let Value::String(value) = value else {
                    return InvalidGeneratedTypeSnafu {
                        path,
                        parameter: &parameter.name,
                        generator: generator_name,
                        found: decode::type_name(&value),
                    }
                    .fail();
                };

                debug!(
                    parameter = %parameter.name,
                    generator = generator_name,
                    "generated parameter value"
                );
                parameter.value = value;
            }

            ensure!(
                !parameter.required || !parameter.value.is_empty(),
                MissingRequiredParameterSnafu {
                    path,
                    parameter: &parameter.name,
                }
            );
        }

        Ok(())
    }

    /// Replaces every `${NAME}` token in the strings of `object` with the
    /// value of the parameter called `NAME`.
    ///
    /// If several parameters share a name, the last one wins. Tokens naming
    /// unknown parameters are left as they are, and substituted values are
    /// not scanned for tokens again.
    pub fn substitute_parameters<T>(parameters: &[Parameter], mut object: T) -> T
    where
        T: VisitStrings,
    {
        let values: HashMap<&str, &str> = parameters
            .iter()
            .map(|parameter| (parameter.name.as_str(), parameter.value.as_str()))
            .collect();

        visit_object_strings(&mut object, |input| substitute_tokens(input, &values));
        object
    }

    /// Instantiates `template`.
    ///
    /// The input is left unchanged. If the parameters cannot be resolved, the
    /// returned template is an unprocessed copy of the input together with
    /// the single parameter error. Otherwise every object is decoded (if
    /// needed), substituted, stripped of its namespace and labelled. Objects
    /// failing any of these steps keep their original form and contribute
    /// one error each.
    #[instrument(
        skip_all,
        fields(
            template = template.metadata.name.as_deref(),
            objects = template.objects.len(),
        )
    )]
    pub fn process<K: TemplateResource>(&self, template: &Template<K>) -> Processed<K> {
        let mut processed = template.clone();

        if let Err(error) = self.generate_parameter_values(&mut processed) {
            warn!(
                error = &error as &dyn std::error::Error,
                "failed to resolve template parameters"
            );
            return Processed {
                template: template.clone(),
                errors: Errors(vec![error]),
            };
        }

        let objects_path = FieldPath::new("template").child("objects");
        let mut errors = Vec::new();

        for (index, object) in processed.objects.iter_mut().enumerate() {
            let path = objects_path.index(index);
            match self.process_object(
                object.clone(),
                &processed.parameters,
                &processed.object_labels,
                &path,
            ) {
                Ok(result) => *object = result,
                Err(error) => {
                    warn!(
                        error = &error as &dyn std::error::Error,
                        object.index = index,
                        "failed to process template object"
                    );
                    errors.push(error);
                }
            }
        }

        processed.message = processed
            .message
            .take()
            .map(|message| Self::substitute_parameters(&processed.parameters, message));

        debug!(errors = errors.len(), "processed template");
        Processed {
            template: processed,
            errors: Errors(errors),
        }
    }

    fn process_object<K: TemplateResource>(
        &self,
        object: TemplateObject<K>,
        parameters: &[Parameter],
        object_labels: &BTreeMap<String, String>,
        path: &FieldPath,
    ) -> Result<TemplateObject<K>, Error> {
        let object = match object {
            TemplateObject::Raw(raw) => TemplateObject::Unstructured(
                self.decoder
                    .decode(&raw)
                    .context(ObjectDecodeFailedSnafu { path: path.clone() })?,
            ),
            decoded => decoded,
        };

        let mut object = Self::substitute_parameters(parameters, object);

        if let Some(namespace) = metadata::strip_namespace(&mut object) {
            debug!(%path, %namespace, "stripped namespace from object");
        }

        labels::add_object_labels(&mut object, object_labels)
            .context(LabelApplicationFailedSnafu {
                path: path.child("metadata").child("labels"),
            })?;

        Ok(object)
    }
}

fn substitute_tokens(input: &str, values: &HashMap<&str, &str>) -> String {
    PARAMETER_TOKEN_REGEX
        .replace_all(input, |captures: &Captures| match values.get(&captures[1]) {
            Some(value) => (*value).to_owned(),
            None => captures[0].to_owned(),
        })
        .into_owned()
}
