//! In-memory model of one keyed resource's expected state

use std::fmt;

use crate::adapter::{AdapterResult, Status};
use crate::operations::{Operation, Payload};

/// State of the modelled resource.
///
/// Fields only exist while the resource does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ResourceState {
    #[default]
    Absent,
    Present(Payload),
}

impl ResourceState {
    pub fn exists(&self) -> bool {
        matches!(self, ResourceState::Present(_))
    }

    pub fn fields(&self) -> Option<&Payload> {
        match self {
            ResourceState::Present(fields) => Some(fields),
            ResourceState::Absent => None,
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Absent => write!(f, "absent"),
            ResourceState::Present(fields) => write!(f, "present{}", fields),
        }
    }
}

/// Set of statuses the model accepts for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Expectation {
    Ok,
    NotFound,
    Rejected,
    /// Either `NotFound` or `Rejected`
    Failure,
}

impl Expectation {
    pub fn admits(self, status: Status) -> bool {
        match self {
            Expectation::Ok => status == Status::Ok,
            Expectation::NotFound => status == Status::NotFound,
            Expectation::Rejected => status == Status::Rejected,
            Expectation::Failure => matches!(status, Status::NotFound | Status::Rejected),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Ok => write!(f, "Ok"),
            Expectation::NotFound => write!(f, "NotFound"),
            Expectation::Rejected => write!(f, "Rejected"),
            Expectation::Failure => write!(f, "NotFound|Rejected"),
        }
    }
}

/// What the model predicts for one operation, and the state it moves to if
/// the prediction is confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExpectedOutcome {
    pub status: Expectation,
    /// Fields a successful read must return
    pub payload: Option<Payload>,
    /// State to commit once the system agrees
    pub next: ResourceState,
}

impl ExpectedOutcome {
    fn new(status: Expectation, next: ResourceState) -> Self {
        Self {
            status,
            payload: None,
            next,
        }
    }

    /// Compare against an observed result.
    ///
    /// Returns a description of the first disagreement, if any. Payloads are
    /// only compared when the model predicts one (reads of a present resource).
    pub fn mismatch(&self, actual: &AdapterResult) -> Option<String> {
        if !self.status.admits(actual.status) {
            return Some(format!(
                "expected status {}, got {}",
                self.status, actual.status
            ));
        }

        let expected = self.payload.as_ref()?;
        let Some(observed) = actual.payload.as_ref() else {
            return Some("expected a payload, got none".to_string());
        };
        observed.first_difference(expected).map(|(field, got, want)| {
            format!(
                "field `{}`: expected {:?}, got {:?}",
                field,
                want.unwrap_or("<missing>"),
                got.unwrap_or("<missing>")
            )
        })
    }
}

/// Expected state of the single resource a run targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceModel {
    state: ResourceState,
}

impl ResourceModel {
    /// A model of a resource that does not exist yet
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    pub fn exists(&self) -> bool {
        self.state.exists()
    }

    pub fn fields(&self) -> Option<&Payload> {
        self.state.fields()
    }

    /// Predict the outcome of `op` from the current state.
    ///
    /// The model itself is not changed; the caller commits
    /// [`ExpectedOutcome::next`] once the system has confirmed the prediction.
    pub fn apply_expected(&self, op: &Operation) -> ExpectedOutcome {
        use Expectation::*;

        let current = self.state.clone();
        match (op, &self.state) {
            (Operation::Create { payload, .. }, ResourceState::Absent) => {
                ExpectedOutcome::new(Ok, ResourceState::Present(payload.clone()))
            }
            (Operation::Create { .. }, ResourceState::Present(_)) => {
                ExpectedOutcome::new(Rejected, current)
            }
            (Operation::Read { .. }, ResourceState::Absent) => {
                ExpectedOutcome::new(NotFound, current)
            }
            (Operation::Read { .. }, ResourceState::Present(fields)) => ExpectedOutcome {
                status: Ok,
                payload: Some(fields.clone()),
                next: current,
            },
            (Operation::Update { .. }, ResourceState::Absent) => {
                ExpectedOutcome::new(Failure, current)
            }
            (Operation::Update { payload, .. }, ResourceState::Present(fields)) => {
                ExpectedOutcome::new(Ok, ResourceState::Present(fields.overlaid(payload)))
            }
            (Operation::Delete { .. }, ResourceState::Absent) => {
                ExpectedOutcome::new(Failure, current)
            }
            (Operation::Delete { .. }, ResourceState::Present(_)) => {
                ExpectedOutcome::new(Ok, ResourceState::Absent)
            }
        }
    }

    /// Commit a confirmed transition
    pub fn commit(&mut self, outcome: ExpectedOutcome) {
        self.state = outcome.next;
    }

    /// Force the model to believe the resource is gone
    pub fn resync_absent(&mut self) {
        self.state = ResourceState::Absent;
    }
}
