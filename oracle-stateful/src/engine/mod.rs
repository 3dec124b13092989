//! The oracle engine: drive a sequence against a model and a system in
//! lockstep and stop at the first disagreement

pub mod cleanup;
pub mod trace;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use oracle::{DiscardReason, DivergencePolicy, KeyStrategy, OracleConfig, RuntimeFault};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::adapter::{AdapterResult, Status, SystemAdapter};
use crate::model::{ExpectedOutcome, Expectation, ResourceModel, ResourceState};
use crate::operations::decoder::{OperationDecoder, SeedValues};
use crate::operations::{Operation, OperationSequence, Payload};

pub use cleanup::CleanupGuard;
pub use trace::{RunTrace, TraceStep};

/// Model prediction and system observation disagreed
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DivergenceReport {
    /// Index of the diverging operation. Equal to the sequence length for the
    /// follow-up presence check.
    pub operation_index: usize,
    pub operation: Operation,
    pub expected_status: Expectation,
    pub expected_payload: Option<Payload>,
    pub actual: AdapterResult,
    /// Model state before the diverging operation
    pub state_before: ResourceState,
    /// First disagreement, in words
    pub description: String,
    /// Steps up to and including the diverging one
    pub trace: Option<RunTrace>,
}

impl fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Divergence at operation {}: {}",
            self.operation_index, self.operation
        )?;
        write!(f, "\n  Expected: {}", self.expected_status)?;
        if let Some(payload) = &self.expected_payload {
            write!(f, " {}", payload)?;
        }
        write!(f, "\n  Actual: {}", self.actual)?;
        write!(f, "\n  Reason: {}", self.description)?;
        write!(f, "\n  State before: {}", self.state_before)?;
        if let Some(trace) = &self.trace {
            write!(f, "\n  Trace:\n{}", trace)?;
        }
        Ok(())
    }
}

/// Summary of a run in which the system agreed with the model throughout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    pub key: String,
    pub operations_executed: usize,
    /// Steps on which the model was resynchronised instead of failing
    pub resynchronized: usize,
    pub final_state: ResourceState,
    pub trace: Option<RunTrace>,
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Verdict {
    Passed(RunSummary),
    /// Filtered out before or during the run; not a failure
    Discarded(DiscardReason),
    /// The harness found a real disagreement
    Diverged(Box<DivergenceReport>),
    /// The environment broke
    Faulted {
        /// Operation whose execution faulted or panicked. A panic outside any
        /// adapter call is reported at 0.
        operation_index: usize,
        fault: RuntimeFault,
    },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed(_))
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, Verdict::Discarded(_))
    }

    /// Diverged or faulted
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Diverged(_) | Verdict::Faulted { .. })
    }

    pub fn divergence(&self) -> Option<&DivergenceReport> {
        match self {
            Verdict::Diverged(report) => Some(report),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<RunSummary, RunError> {
        match self {
            Verdict::Passed(summary) => Ok(summary),
            Verdict::Discarded(reason) => Err(RunError::Discarded(reason)),
            Verdict::Diverged(report) => Err(RunError::Diverged(report)),
            Verdict::Faulted {
                operation_index,
                fault,
            } => Err(RunError::Faulted {
                operation_index,
                fault,
            }),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed(summary) => write!(
                f,
                "passed: {} operation(s) on {:?}, final state {}",
                summary.operations_executed, summary.key, summary.final_state
            ),
            Verdict::Discarded(reason) => write!(f, "discarded: {}", reason),
            Verdict::Diverged(report) => write!(f, "{}", report),
            Verdict::Faulted {
                operation_index,
                fault,
            } => write!(f, "runtime fault at operation {}: {}", operation_index, fault),
        }
    }
}

/// A run that did not pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("run discarded: {0}")]
    Discarded(DiscardReason),

    #[error("{0}")]
    Diverged(Box<DivergenceReport>),

    #[error("runtime fault at operation {operation_index}: {fault}")]
    Faulted {
        operation_index: usize,
        fault: RuntimeFault,
    },
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Execute one operation, turning a panicking adapter into a fault
fn execute_guarded<A: SystemAdapter + ?Sized>(
    adapter: &mut A,
    op: &Operation,
) -> Result<AdapterResult, RuntimeFault> {
    panic::catch_unwind(AssertUnwindSafe(|| adapter.execute(op)))
        .unwrap_or_else(|payload| Err(RuntimeFault::panicked(panic_message(payload.as_ref()))))
}

/// How a disagreement is handled under the active policy
enum Tolerance {
    Resync,
    Discard,
    Fail,
}

/// Runs decoded sequences against a model and a system
#[derive(Debug, Clone, Default)]
pub struct OracleEngine {
    config: OracleConfig,
    decoder: OperationDecoder,
}

impl OracleEngine {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            decoder: OperationDecoder::new(),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Decode one raw input and run it on a fresh model.
    ///
    /// `run_id` only matters under [`KeyStrategy::Partitioned`].
    pub fn run_input<A: SystemAdapter + ?Sized>(
        &self,
        raw: &[u8],
        seeds: &SeedValues,
        run_id: u64,
        adapter: &mut A,
    ) -> Verdict {
        match self.config.key_strategy {
            KeyStrategy::Verbatim => self.run_seeded(raw, seeds, adapter),
            KeyStrategy::Partitioned => self.run_seeded(raw, &seeds.partitioned(run_id), adapter),
        }
    }

    /// Decode and run with `seeds` taken as given, ignoring the key strategy
    pub(crate) fn run_seeded<A: SystemAdapter + ?Sized>(
        &self,
        raw: &[u8],
        seeds: &SeedValues,
        adapter: &mut A,
    ) -> Verdict {
        let sequence = match self.decoder.decode(raw, seeds) {
            Ok(sequence) => sequence,
            Err(reason) => {
                debug!(%reason, "input discarded at decode");
                return Verdict::Discarded(reason);
            }
        };

        let mut model = ResourceModel::new();
        self.run(&sequence, &mut model, adapter)
    }

    /// Run `sequence` against `model` and `adapter`.
    ///
    /// The run's key is deleted from the system on every exit path.
    pub fn run<A: SystemAdapter + ?Sized>(
        &self,
        sequence: &OperationSequence,
        model: &mut ResourceModel,
        adapter: &mut A,
    ) -> Verdict {
        let span = info_span!("oracle_run", key = sequence.key(), operations = sequence.len());
        let _enter = span.enter();

        let mut guard = CleanupGuard::new(adapter, sequence.key());
        let verdict = self.drive(sequence, model, &mut *guard);
        drop(guard);

        match &verdict {
            Verdict::Passed(summary) => info!(
                executed = summary.operations_executed,
                resynchronized = summary.resynchronized,
                "run passed"
            ),
            Verdict::Discarded(reason) => debug!(%reason, "run discarded"),
            Verdict::Diverged(report) => warn!(
                index = report.operation_index,
                operation = %report.operation,
                reason = %report.description,
                "divergence"
            ),
            Verdict::Faulted {
                operation_index,
                fault,
            } => warn!(index = operation_index, %fault, "runtime fault"),
        }

        verdict
    }

    fn tolerance(
        &self,
        op: &Operation,
        model: &ResourceModel,
        actual: &AdapterResult,
    ) -> Tolerance {
        if self.config.divergence_policy == DivergencePolicy::Strict {
            return Tolerance::Fail;
        }

        match (op, model.exists(), actual.status) {
            (Operation::Update { .. }, true, Status::NotFound | Status::Rejected) => {
                Tolerance::Resync
            }
            (Operation::Create { .. }, false, Status::Rejected) => Tolerance::Discard,
            _ => Tolerance::Fail,
        }
    }

    fn drive<A: SystemAdapter + ?Sized>(
        &self,
        sequence: &OperationSequence,
        model: &mut ResourceModel,
        adapter: &mut A,
    ) -> Verdict {
        let mut trace = self.config.record_trace.then(RunTrace::new);
        let mut resynchronized = 0;

        for (index, op) in sequence.operations().iter().enumerate() {
            let expected = model.apply_expected(op);
            debug!(index, operation = %op, expected = %expected.status, "executing");

            let actual = match execute_guarded(adapter, op) {
                Ok(actual) => actual,
                Err(fault) => {
                    return Verdict::Faulted {
                        operation_index: index,
                        fault,
                    };
                }
            };

            let Some(description) = expected.mismatch(&actual) else {
                record(&mut trace, index, op, &expected, actual, false);
                model.commit(expected);
                continue;
            };

            match self.tolerance(op, model, &actual) {
                Tolerance::Resync => {
                    warn!(
                        index,
                        status = %actual.status,
                        "update failed on a present resource, resynchronizing model to absent"
                    );
                    record(&mut trace, index, op, &expected, actual, true);
                    model.resync_absent();
                    resynchronized += 1;
                }
                Tolerance::Discard => {
                    debug!(index, "system rejected generated input");
                    return Verdict::Discarded(DiscardReason::RejectedBySystem {
                        operation_index: index,
                    });
                }
                Tolerance::Fail => {
                    let state_before = model.state().clone();
                    record(&mut trace, index, op, &expected, actual.clone(), false);
                    return Verdict::Diverged(Box::new(DivergenceReport {
                        operation_index: index,
                        operation: op.clone(),
                        expected_status: expected.status,
                        expected_payload: expected.payload,
                        actual,
                        state_before,
                        description,
                        trace,
                    }));
                }
            }
        }

        if self.config.verify_final_state
            && let Some(verdict) = self.verify_presence(sequence, model, adapter, &mut trace)
        {
            return verdict;
        }

        Verdict::Passed(RunSummary {
            key: sequence.key().to_string(),
            operations_executed: sequence.len(),
            resynchronized,
            final_state: model.state().clone(),
            trace,
        })
    }

    /// Follow-up read confirming the system's presence matches the model
    fn verify_presence<A: SystemAdapter + ?Sized>(
        &self,
        sequence: &OperationSequence,
        model: &ResourceModel,
        adapter: &mut A,
        trace: &mut Option<RunTrace>,
    ) -> Option<Verdict> {
        let index = sequence.len();
        let op = Operation::Read {
            key: sequence.key().to_string(),
        };
        let expected = model.apply_expected(&op);

        let actual = match execute_guarded(adapter, &op) {
            Ok(actual) => actual,
            Err(fault) => {
                return Some(Verdict::Faulted {
                    operation_index: index,
                    fault,
                });
            }
        };

        let description = expected.mismatch(&actual)?;
        record(trace, index, &op, &expected, actual.clone(), false);
        Some(Verdict::Diverged(Box::new(DivergenceReport {
            operation_index: index,
            operation: op,
            expected_status: expected.status,
            expected_payload: expected.payload,
            actual,
            state_before: model.state().clone(),
            description: format!("final state check: {}", description),
            trace: trace.take(),
        })))
    }
}

fn record(
    trace: &mut Option<RunTrace>,
    index: usize,
    op: &Operation,
    expected: &ExpectedOutcome,
    actual: AdapterResult,
    resynchronized: bool,
) {
    if let Some(trace) = trace {
        trace.push(TraceStep {
            index,
            operation: op.clone(),
            expected: expected.status,
            actual,
            resynchronized,
        });
    }
}
