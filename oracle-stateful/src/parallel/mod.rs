//! Batches of independent runs spread over worker threads.
//!
//! Isolation between concurrent runs comes from key partitioning, not
//! locking: case `i` always targets a key derived from its seed key and `i`,
//! whatever the configured [`KeyStrategy`](oracle::KeyStrategy), so runs
//! sharing one system never see each other's records.

use std::panic::{self, AssertUnwindSafe};

use oracle::RuntimeFault;
use tracing::{debug, info};

use crate::adapter::SystemAdapter;
use crate::engine::{DivergenceReport, OracleEngine, Verdict, panic_message};
use crate::operations::decoder::SeedValues;

/// One input from the generation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCase {
    /// Opcode bytes
    pub operations: Vec<u8>,
    pub seeds: SeedValues,
}

impl RunCase {
    pub fn new(operations: impl Into<Vec<u8>>, seeds: SeedValues) -> Self {
        Self {
            operations: operations.into(),
            seeds,
        }
    }
}

/// Aggregated outcome of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub passed: usize,
    pub discarded: usize,
    /// Divergences by case index, in case order
    pub divergences: Vec<(usize, DivergenceReport)>,
    /// Runtime faults by case index, in case order
    pub faults: Vec<(usize, RuntimeFault)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.passed + self.discarded + self.divergences.len() + self.faults.len()
    }

    /// No divergence and no fault
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty() && self.faults.is_empty()
    }

    fn absorb(&mut self, index: usize, verdict: Verdict) {
        match verdict {
            Verdict::Passed(_) => self.passed += 1,
            Verdict::Discarded(_) => self.discarded += 1,
            Verdict::Diverged(report) => self.divergences.push((index, *report)),
            Verdict::Faulted { fault, .. } => self.faults.push((index, fault)),
        }
    }
}

impl OracleEngine {
    /// Run every case, spreading them over the configured number of workers.
    ///
    /// Each worker builds its own adapter with `make_adapter(worker_id)` and
    /// handles cases `worker_id`, `worker_id + workers`, ... in order. Case `i`
    /// runs on the key partitioned by `i` even under
    /// [`KeyStrategy::Verbatim`](oracle::KeyStrategy::Verbatim). A panicking
    /// run is reported as a [`RuntimeFault::Panicked`] for its case.
    pub fn run_batch<A, F>(&self, cases: &[RunCase], make_adapter: F) -> BatchReport
    where
        A: SystemAdapter,
        F: Fn(usize) -> A + Sync,
    {
        let workers = self.config().parallel.workers.clamp(1, cases.len().max(1));
        let make_adapter = &make_adapter;

        let outcomes = crossbeam::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|worker_id| {
                    s.spawn(move |_| {
                        let mut adapter = make_adapter(worker_id);
                        let mut verdicts = Vec::new();
                        for index in (worker_id..cases.len()).step_by(workers) {
                            let case = &cases[index];
                            debug!(worker_id, index, "running case");
                            let verdict = panic::catch_unwind(AssertUnwindSafe(|| {
                                self.run_seeded(
                                    &case.operations,
                                    &case.seeds.partitioned(index as u64),
                                    &mut adapter,
                                )
                            }))
                            .unwrap_or_else(|payload| Verdict::Faulted {
                                operation_index: 0,
                                fault: RuntimeFault::panicked(panic_message(payload.as_ref())),
                            });
                            verdicts.push((index, verdict));
                        }
                        verdicts
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

        let mut slots: Vec<Option<Verdict>> = vec![None; cases.len()];
        for (index, verdict) in outcomes {
            slots[index] = Some(verdict);
        }

        let mut report = BatchReport::default();
        for (index, slot) in slots.into_iter().enumerate() {
            let verdict = slot.unwrap_or_else(|| Verdict::Faulted {
                operation_index: 0,
                fault: RuntimeFault::panicked("worker terminated before reporting"),
            });
            report.absorb(index, verdict);
        }

        info!(
            cases = cases.len(),
            workers,
            passed = report.passed,
            discarded = report.discarded,
            divergences = report.divergences.len(),
            faults = report.faults.len(),
            "batch finished"
        );
        report
    }
}
