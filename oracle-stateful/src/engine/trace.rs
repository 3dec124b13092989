//! Per-step record of a run

use std::fmt;

use crate::adapter::AdapterResult;
use crate::model::Expectation;
use crate::operations::Operation;

/// One executed operation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TraceStep {
    pub index: usize,
    pub operation: Operation,
    pub expected: Expectation,
    pub actual: AdapterResult,
    /// The model was forced to absent after this step
    pub resynchronized: bool,
}

/// Trace of a run showing every executed step in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunTrace {
    steps: Vec<TraceStep>,
}

impl RunTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&TraceStep> {
        self.steps.last()
    }
}

impl fmt::Display for RunTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(
                f,
                "  #{} {} expected {} got {}",
                step.index, step.operation, step.expected, step.actual
            )?;
            if step.resynchronized {
                write!(f, " (model resynchronized to absent)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
