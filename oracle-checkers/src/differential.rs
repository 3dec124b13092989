//! Differential parsing of structured documents.
//!
//! The same bytes go through two independent parsers. When both accept the
//! input as a top-level mapping, the mappings must be structurally equal.
//! One parser rejecting what the other accepts is recorded but is not a
//! violation.

use oracle::{CheckError, InvariantChecker, Violation};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Top-level document shape shared by every parser
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} parse failed: {message}")]
pub struct ParseError {
    pub format: &'static str,
    pub message: String,
}

impl ParseError {
    pub fn new(format: &'static str, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

/// A parser for some structured-data format
pub trait DocumentParser {
    fn format(&self) -> &'static str;

    fn parse(&self, bytes: &[u8]) -> Result<Document, ParseError>;
}

impl<P: DocumentParser + ?Sized> DocumentParser for &P {
    fn format(&self) -> &'static str {
        (**self).format()
    }

    fn parse(&self, bytes: &[u8]) -> Result<Document, ParseError> {
        (**self).parse(bytes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn format(&self) -> &'static str {
        "json"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Document, ParseError> {
        serde_json::from_slice(bytes).map_err(|err| ParseError::new(self.format(), err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl DocumentParser for YamlParser {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Document, ParseError> {
        serde_yaml::from_slice(bytes).map_err(|err| ParseError::new(self.format(), err.to_string()))
    }
}

/// Two parsers that accept the same input must agree on its structure
#[derive(Debug, Clone, Default)]
pub struct DifferentialChecker<A, B> {
    left: A,
    right: B,
}

impl<A: DocumentParser, B: DocumentParser> DifferentialChecker<A, B> {
    pub fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

impl DifferentialChecker<JsonParser, YamlParser> {
    pub fn json_yaml() -> Self {
        Self::new(JsonParser, YamlParser)
    }
}

impl<A: DocumentParser, B: DocumentParser> InvariantChecker for DifferentialChecker<A, B> {
    type Input = Vec<u8>;

    fn name(&self) -> &'static str {
        "differential_equality"
    }

    fn check(&self, input: &Vec<u8>) -> Result<(), CheckError> {
        let (left, right) = match (self.left.parse(input), self.right.parse(input)) {
            (Ok(left), Ok(right)) => (left, right),
            (left, right) => {
                if let Err(err) = &left {
                    debug!(%err, "left parser rejected input");
                }
                if let Err(err) = &right {
                    debug!(%err, "right parser rejected input");
                }
                return Ok(());
            }
        };

        if left.is_empty() && right.is_empty() {
            return Ok(());
        }

        if left != right {
            return Err(Violation::new(
                self.name(),
                format!(
                    "{} and {} parsed the same bytes into different documents",
                    self.left.format(),
                    self.right.format()
                ),
            )
            .with_context(describe_difference(&left, &right))
            .into());
        }
        Ok(())
    }
}

fn describe_difference(left: &Document, right: &Document) -> String {
    for (key, value) in left {
        match right.get(key) {
            None => return format!("key {:?} only on the left", key),
            Some(other) if other != value => {
                return format!("key {:?}: {} vs {}", key, value, other);
            }
            Some(_) => {}
        }
    }
    right
        .keys()
        .find(|key| !left.contains_key(*key))
        .map(|key| format!("key {:?} only on the right", key))
        .unwrap_or_else(|| "documents differ".to_string())
}
