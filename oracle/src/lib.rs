//! # Oracle
//!
//! Core of an invariant-oracle testing framework. An external generation
//! engine supplies raw inputs; the oracle decodes them, executes them and
//! compares what happened against what must happen.
//!
//! This crate holds the pieces both operating modes share:
//!
//! - **Configuration**: [`OracleConfig`] with divergence policy, key
//!   partitioning and parallelism settings
//! - **Failure taxonomy**: discards, violations and runtime faults are
//!   distinct types so triage can tell them apart
//! - **Stateless harness**: [`InvariantChecker`], [`check`] and [`check_all`]
//!
//! The stateful CRUD model checker lives in `oracle-stateful`; the concrete
//! stateless checkers live in `oracle-checkers`.
//!
//! ## Quick Example
//!
//! ```rust
//! use oracle::{check, CheckError, CheckOutcome, FnChecker};
//!
//! let checker = FnChecker::new("len_bound", |s: &String| {
//!     if s.chars().count() <= s.len() {
//!         Ok(())
//!     } else {
//!         Err(CheckError::violation("len_bound", "more chars than bytes"))
//!     }
//! });
//!
//! assert_eq!(check(&checker, &"héllo".to_string()), CheckOutcome::Holds);
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod execution;

pub use checker::{FnChecker, InvariantChecker};
pub use config::{ConfigError, DivergencePolicy, KeyStrategy, OracleConfig, ParallelConfig};
pub use error::{CheckError, DiscardReason, RuntimeFault, Violation};
pub use execution::{CheckOutcome, CheckReport, check, check_all};
