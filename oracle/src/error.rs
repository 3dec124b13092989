//! Failure taxonomy shared by the stateful and stateless modes.
//!
//! Three outcomes other than success exist and they are never conflated:
//!
//! - a [`DiscardReason`] means the input was filtered out before any assertion
//!   and is not a failure,
//! - a [`Violation`] (or a stateful divergence) means the harness found a
//!   real disagreement,
//! - a [`RuntimeFault`] means the environment broke and says nothing about
//!   the system's correctness.

use std::fmt;

use thiserror::Error;

/// Why an input was discarded without producing an assertion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DiscardReason {
    /// The resource key was empty
    #[error("empty key")]
    EmptyKey,

    /// A seed value was not valid UTF-8
    #[error("seed value `{field}` is not valid UTF-8")]
    InvalidEncoding { field: &'static str },

    /// A numeric parameter was outside the range the property is defined for
    #[error("{what} is out of bounds")]
    OutOfBounds { what: String },

    /// The system refused the generated input at the given operation
    #[error("system rejected the generated input at operation {operation_index}")]
    RejectedBySystem { operation_index: usize },

    /// The input could not be turned into a checker input at all
    #[error("input could not be parsed: {reason}")]
    Unparseable { reason: String },
}

impl DiscardReason {
    pub fn out_of_bounds(what: impl Into<String>) -> Self {
        Self::OutOfBounds { what: what.into() }
    }

    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self::Unparseable {
            reason: reason.into(),
        }
    }
}

/// An infrastructure-level failure raised while talking to the system
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RuntimeFault {
    /// The transport to the system failed mid-call
    #[error("transport fault: {message}")]
    Transport { message: String },

    /// The system could not be reached at all
    #[error("system unavailable: {message}")]
    Unavailable { message: String },

    /// A worker panicked while executing a run
    #[error("worker panicked: {message}")]
    Panicked { message: String },
}

impl RuntimeFault {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }
}

/// A stateless property that did not hold
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Violation {
    /// Name of the violated property
    pub property: String,
    /// What went wrong
    pub message: String,
    /// Extra detail, usually the values that disagreed
    pub context: Option<String>,
}

impl Violation {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property `{}` violated: {}", self.property, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " (context: {})", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violation {}

/// Error returned by a single stateless check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("discarded: {0}")]
    Discard(#[from] DiscardReason),

    #[error(transparent)]
    Violation(#[from] Violation),
}

impl CheckError {
    /// Shorthand for a violation of `property`
    pub fn violation(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Violation(Violation::new(property, message))
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, CheckError::Discard(_))
    }
}
