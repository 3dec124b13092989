//! The boundary between the oracle and a concrete system under test.
//!
//! Adapters normalise whatever the system signals (HTTP statuses, constraint
//! violations, missing rows) into the three-valued [`Status`]. That mapping is
//! the only coupling between the engine and any particular system.

pub mod memory;

use std::fmt;

use oracle::RuntimeFault;

use crate::operations::{Operation, Payload};

/// Normalised status of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Status {
    Ok,
    NotFound,
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "Ok"),
            Status::NotFound => write!(f, "NotFound"),
            Status::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Normalised outcome of one call into the system
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AdapterResult {
    pub status: Status,
    /// Returned fields, only meaningful for reads
    pub payload: Option<Payload>,
}

impl AdapterResult {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            payload: None,
        }
    }

    pub fn ok_with(payload: Payload) -> Self {
        Self {
            status: Status::Ok,
            payload: Some(payload),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    pub fn rejected() -> Self {
        Self {
            status: Status::Rejected,
            payload: None,
        }
    }
}

impl fmt::Display for AdapterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(payload) = &self.payload {
            write!(f, " {}", payload)?;
        }
        Ok(())
    }
}

/// Uniform CRUD surface over a system under test.
///
/// Modelled outcomes come back as `Ok(AdapterResult)`; `Err` is reserved for
/// transport and infrastructure faults that say nothing about the system's
/// correctness.
pub trait SystemAdapter {
    fn create(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault>;

    fn read(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault>;

    fn update(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault>;

    fn delete(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault>;

    /// Dispatch one decoded operation
    fn execute(&mut self, op: &Operation) -> Result<AdapterResult, RuntimeFault> {
        match op {
            Operation::Create { key, payload } => self.create(key, payload),
            Operation::Read { key } => self.read(key),
            Operation::Update { key, payload } => self.update(key, payload),
            Operation::Delete { key } => self.delete(key),
        }
    }
}

impl<A: SystemAdapter + ?Sized> SystemAdapter for &mut A {
    fn create(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault> {
        (**self).create(key, payload)
    }

    fn read(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault> {
        (**self).read(key)
    }

    fn update(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault> {
        (**self).update(key, payload)
    }

    fn delete(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault> {
        (**self).delete(key)
    }

    fn execute(&mut self, op: &Operation) -> Result<AdapterResult, RuntimeFault> {
        (**self).execute(op)
    }
}

impl<A: SystemAdapter + ?Sized> SystemAdapter for Box<A> {
    fn create(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault> {
        (**self).create(key, payload)
    }

    fn read(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault> {
        (**self).read(key)
    }

    fn update(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault> {
        (**self).update(key, payload)
    }

    fn delete(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault> {
        (**self).delete(key)
    }

    fn execute(&mut self, op: &Operation) -> Result<AdapterResult, RuntimeFault> {
        (**self).execute(op)
    }
}
