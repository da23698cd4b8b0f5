//! Declared payload requirements.

use crate::errors::DefinitionError;
use crate::parameters::interpolate_paths;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

/// A requirement regular expression.
///
/// Compiled once when built, unless it embeds `%dotted.path%` placeholders;
/// those are compiled per check after substitution.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Option<Regex>,
}

impl Pattern {
    /// Builds a pattern, compiling it if it has no placeholders.
    ///
    /// # Errors
    ///
    /// Returns the regex error for an invalid placeholder-free pattern.
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let compiled = if has_placeholders(&source) {
            None
        } else {
            Some(Regex::new(&source)?)
        };
        Ok(Self { source, compiled })
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the compiled regex, or `None` if the pattern has placeholders.
    #[must_use]
    pub const fn compiled(&self) -> Option<&Regex> {
        self.compiled.as_ref()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn has_placeholders(source: &str) -> bool {
    let mut found = false;
    interpolate_paths(source, |_| {
        found = true;
        Some(String::new())
    });
    found
}

/// What a payload field must look like.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Exact equality.
    Literal(Value),
    /// Membership in a set of values.
    OneOf(Vec<Value>),
    /// Regular expression matched against the stringified value. May embed
    /// `%dotted.path%` placeholders.
    Pattern(Pattern),
}

impl Expectation {
    /// Interprets a raw requirement value.
    ///
    /// Strings are patterns, sequences are membership sets, and everything
    /// else is a literal. A single-key mapping `equals`, `one_of` or
    /// `pattern` selects the form explicitly, which is how a literal string
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns the regex error for an invalid pattern.
    pub fn from_value(value: Value) -> Result<Self, regex::Error> {
        match value {
            Value::String(pattern) => Ok(Self::Pattern(Pattern::new(pattern)?)),
            Value::Array(items) => Ok(Self::OneOf(items)),
            Value::Object(map) if map.len() == 1 => {
                let Some((key, inner)) = map.into_iter().next() else {
                    return Ok(Self::Literal(Value::Object(Map::new())));
                };
                let inner = match (key.as_str(), inner) {
                    ("equals", inner) => return Ok(Self::Literal(inner)),
                    ("one_of", Value::Array(items)) => return Ok(Self::OneOf(items)),
                    ("pattern", Value::String(pattern)) => {
                        return Ok(Self::Pattern(Pattern::new(pattern)?))
                    }
                    (_, inner) => inner,
                };
                let mut map = Map::new();
                map.insert(key, inner);
                Ok(Self::Literal(Value::Object(map)))
            }
            other => Ok(Self::Literal(other)),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::OneOf(items) => write!(f, "one of {}", Value::Array(items.clone())),
            Self::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

/// A single `field -> expectation` rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    /// Dotted path into the payload.
    pub field: String,
    /// The expectation for that field.
    pub expected: Expectation,
}

impl Requirement {
    /// Creates a new requirement.
    #[must_use]
    pub fn new(field: impl Into<String>, expected: Expectation) -> Self {
        Self {
            field: field.into(),
            expected,
        }
    }
}

/// The requirement groups of a workflow, evaluated in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirements {
    groups: Vec<Vec<Requirement>>,
}

impl Requirements {
    /// Builds requirements from the `requirements.data` list of mappings.
    /// Fields keep their declared order.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidPattern`] for a pattern that does
    /// not compile.
    pub fn from_data(workflow_id: &str, data: Vec<Map<String, Value>>) -> Result<Self, DefinitionError> {
        let groups = data
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|(field, value)| match Expectation::from_value(value) {
                        Ok(expected) => Ok(Requirement::new(field, expected)),
                        Err(e) => Err(DefinitionError::InvalidPattern {
                            workflow_id: workflow_id.to_string(),
                            field,
                            message: e.to_string(),
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// Adds a group of requirements.
    #[must_use]
    pub fn with_group(mut self, group: Vec<Requirement>) -> Self {
        self.groups.push(group);
        self
    }

    /// Iterates every requirement in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.groups.iter().flatten()
    }

    /// Returns true if no requirement is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }
}
