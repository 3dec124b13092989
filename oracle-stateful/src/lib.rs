//! # Oracle Stateful
//!
//! Model-based sequential testing of keyed CRUD resources. A raw byte stream
//! plus four seed values decode into at most ten operations; the engine
//! applies each one to an in-memory [`ResourceModel`](model::ResourceModel)
//! and to the real system through a [`SystemAdapter`](adapter::SystemAdapter),
//! and fails the run at the first disagreement.
//!
//! ## Features
//!
//! - **Stable decoding**: `byte % 4` selects Create/Read/Update/Delete, so saved
//!   corpora replay identically
//! - **Three-valued adapter results**: `Ok`, `NotFound`, `Rejected`; transport
//!   failures are runtime faults, never divergences
//! - **Divergence policy**: strict, or tolerant of benign rejects
//! - **Guaranteed cleanup**: the run's key is deleted on every exit path
//! - **Parallel batches**: key partitioning isolates concurrent runs
//!
//! ## Quick Example
//!
//! ```rust
//! use oracle_stateful::prelude::*;
//!
//! let service = InMemoryUserService::new();
//! let mut adapter = MemoryAdapter::new(service.clone());
//! let engine = OracleEngine::new(OracleConfig::strict());
//!
//! let seeds = SeedValues::new(
//!     "john@smith.com",
//!     "John Smith",
//!     "+1 234 567 8901",
//!     "+9 876 543 2109",
//! );
//!
//! // Create, Read, Delete
//! let verdict = engine.run_input(&[0, 1, 3], &seeds, 0, &mut adapter);
//! assert!(verdict.is_pass());
//! assert!(service.is_empty());
//! ```

pub mod adapter;
pub mod engine;
pub mod model;
pub mod operations;
pub mod parallel;

/// Re-exports for convenient imports
pub mod prelude {
    pub use crate::adapter::memory::{InMemoryUserService, MemoryAdapter, Quirk};
    pub use crate::adapter::{AdapterResult, Status, SystemAdapter};
    pub use crate::engine::{
        CleanupGuard, DivergenceReport, OracleEngine, RunError, RunSummary, RunTrace, TraceStep,
        Verdict,
    };
    pub use crate::model::{ExpectedOutcome, Expectation, ResourceModel, ResourceState};
    pub use crate::operations::decoder::{MAX_OPERATIONS, OperationDecoder, SeedValues, decode};
    pub use crate::operations::{
        FIELD_CONTACT_NUMBER, FIELD_NAME, Opcode, Operation, OperationSequence, Payload,
    };
    pub use crate::parallel::{BatchReport, RunCase};
    pub use oracle::{DiscardReason, DivergencePolicy, KeyStrategy, OracleConfig, RuntimeFault};
}
