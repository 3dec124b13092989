//! Decode-execute-compare harness for stateless checkers.

use std::fmt;

use tracing::{debug, info_span, warn};

use crate::checker::InvariantChecker;
use crate::error::{CheckError, DiscardReason, Violation};

/// Outcome of checking one input
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CheckOutcome {
    /// The property held
    Holds,
    /// The input was filtered out; not a failure
    Discarded(DiscardReason),
    /// The property did not hold
    Violated(Violation),
}

impl CheckOutcome {
    pub fn is_violation(&self) -> bool {
        matches!(self, CheckOutcome::Violated(_))
    }

    /// Convert into a result, treating discards as success
    pub fn into_result(self) -> Result<(), Violation> {
        match self {
            CheckOutcome::Violated(violation) => Err(violation),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Holds => write!(f, "holds"),
            CheckOutcome::Discarded(reason) => write!(f, "discarded: {}", reason),
            CheckOutcome::Violated(violation) => write!(f, "{}", violation),
        }
    }
}

/// Check one input against a checker
pub fn check<C: InvariantChecker>(checker: &C, input: &C::Input) -> CheckOutcome {
    let span = info_span!("invariant_check", checker = checker.name());
    let _enter = span.enter();

    match checker.check(input) {
        Ok(()) => {
            debug!(?input, "property holds");
            CheckOutcome::Holds
        }
        Err(CheckError::Discard(reason)) => {
            debug!(?input, %reason, "input discarded");
            CheckOutcome::Discarded(reason)
        }
        Err(CheckError::Violation(violation)) => {
            warn!(?input, %violation, "property violated");
            CheckOutcome::Violated(violation)
        }
    }
}

/// Summary of checking a batch of inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport<T> {
    /// Inputs on which the property was evaluated
    pub checked: usize,
    /// Inputs filtered out before evaluation
    pub discarded: usize,
    /// First violating input, if any. Checking stops there.
    pub failure: Option<(T, Violation)>,
}

impl<T> CheckReport<T> {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Check every input in order, stopping at the first violation
pub fn check_all<C, I>(checker: &C, inputs: I) -> CheckReport<C::Input>
where
    C: InvariantChecker,
    I: IntoIterator<Item = C::Input>,
{
    let mut report = CheckReport {
        checked: 0,
        discarded: 0,
        failure: None,
    };

    for input in inputs {
        match check(checker, &input) {
            CheckOutcome::Holds => report.checked += 1,
            CheckOutcome::Discarded(_) => report.discarded += 1,
            CheckOutcome::Violated(violation) => {
                report.checked += 1;
                report.failure = Some((input, violation));
                break;
            }
        }
    }

    report
}
