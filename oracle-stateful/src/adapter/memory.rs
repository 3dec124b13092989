//! In-memory user service and its adapter.
//!
//! The service keeps users keyed by email, like the REST user API the oracle
//! was first written against. It can be shared by many adapters (and threads)
//! through cheap clones of the handle.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use oracle::RuntimeFault;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::trace;

use super::{AdapterResult, SystemAdapter};
use crate::operations::{FIELD_CONTACT_NUMBER, FIELD_NAME, Payload};

/// A stored user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
    pub contact_number: String,
}

impl UserRecord {
    fn to_payload(&self) -> Payload {
        Payload::new()
            .with(FIELD_NAME, self.name.as_str())
            .with(FIELD_CONTACT_NUMBER, self.contact_number.as_str())
    }
}

/// Errors raised by the user service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("email {0} already added")]
    Duplicate(String),

    #[error("email {0} not found")]
    Missing(String),

    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Known defects the service can be told to reproduce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quirk {
    /// Updating a missing user answers success and changes nothing
    SilentUpdateOnMissing,
    /// Deleting a missing user answers success
    DeleteMissingOk,
}

#[derive(Debug, Default)]
struct ServiceState {
    users: HashMap<String, UserRecord>,
    quirks: HashSet<Quirk>,
}

/// Shared handle to an in-memory user table
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserService {
    state: Arc<Mutex<ServiceState>>,
}

impl InMemoryUserService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that reproduces `quirks`
    pub fn with_quirks(quirks: impl IntoIterator<Item = Quirk>) -> Self {
        let service = Self::new();
        service.state.lock().quirks.extend(quirks);
        service
    }

    fn has_quirk(state: &ServiceState, quirk: Quirk) -> bool {
        state.quirks.contains(&quirk)
    }

    pub fn add_user(&self, email: &str, name: &str, contact_number: &str) -> Result<(), ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::Invalid("name must not be empty".to_string()));
        }

        let mut state = self.state.lock();
        if state.users.contains_key(email) {
            return Err(ServiceError::Duplicate(email.to_string()));
        }
        state.users.insert(
            email.to_string(),
            UserRecord {
                email: email.to_string(),
                name: name.to_string(),
                contact_number: contact_number.to_string(),
            },
        );
        Ok(())
    }

    pub fn get_user(&self, email: &str) -> Result<UserRecord, ServiceError> {
        self.state
            .lock()
            .users
            .get(email)
            .cloned()
            .ok_or_else(|| ServiceError::Missing(email.to_string()))
    }

    /// Patch the given fields of an existing user
    pub fn update_user(
        &self,
        email: &str,
        name: Option<&str>,
        contact_number: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        let silent = Self::has_quirk(&state, Quirk::SilentUpdateOnMissing);

        match state.users.get_mut(email) {
            Some(user) => {
                if let Some(name) = name {
                    user.name = name.to_string();
                }
                if let Some(number) = contact_number {
                    user.contact_number = number.to_string();
                }
                Ok(())
            }
            None if silent => Ok(()),
            None => Err(ServiceError::Missing(email.to_string())),
        }
    }

    pub fn delete_user(&self, email: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        let lenient = Self::has_quirk(&state, Quirk::DeleteMissingOk);

        match state.users.remove(email) {
            Some(_) => Ok(()),
            None if lenient => Ok(()),
            None => Err(ServiceError::Missing(email.to_string())),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.state.lock().users.contains_key(email)
    }

    pub fn len(&self) -> usize {
        self.state.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<ServiceError> for AdapterResult {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Missing(_) => AdapterResult::not_found(),
            ServiceError::Duplicate(_) | ServiceError::Invalid(_) => AdapterResult::rejected(),
        }
    }
}

fn normalize(result: Result<(), ServiceError>) -> AdapterResult {
    match result {
        Ok(()) => AdapterResult::ok(),
        Err(err) => {
            trace!(%err, "service error");
            err.into()
        }
    }
}

/// [`SystemAdapter`] over an [`InMemoryUserService`]
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    service: InMemoryUserService,
    calls: usize,
    fail_after: Option<usize>,
}

impl MemoryAdapter {
    pub fn new(service: InMemoryUserService) -> Self {
        Self {
            service,
            calls: 0,
            fail_after: None,
        }
    }

    /// Every call after the first `calls` fails with a transport fault
    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn service(&self) -> &InMemoryUserService {
        &self.service
    }

    /// Number of calls made through this adapter, faulted ones included
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn enter(&mut self) -> Result<(), RuntimeFault> {
        self.calls += 1;
        match self.fail_after {
            Some(limit) if self.calls > limit => Err(RuntimeFault::unavailable("connection refused")),
            _ => Ok(()),
        }
    }
}

impl SystemAdapter for MemoryAdapter {
    fn create(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault> {
        self.enter()?;
        let (Some(name), Some(number)) = (payload.get(FIELD_NAME), payload.get(FIELD_CONTACT_NUMBER))
        else {
            return Ok(AdapterResult::rejected());
        };
        Ok(normalize(self.service.add_user(key, name, number)))
    }

    fn read(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault> {
        self.enter()?;
        Ok(match self.service.get_user(key) {
            Ok(user) => AdapterResult::ok_with(user.to_payload()),
            Err(err) => err.into(),
        })
    }

    fn update(&mut self, key: &str, payload: &Payload) -> Result<AdapterResult, RuntimeFault> {
        self.enter()?;
        Ok(normalize(self.service.update_user(
            key,
            payload.get(FIELD_NAME),
            payload.get(FIELD_CONTACT_NUMBER),
        )))
    }

    fn delete(&mut self, key: &str) -> Result<AdapterResult, RuntimeFault> {
        self.enter()?;
        Ok(normalize(self.service.delete_user(key)))
    }
}
