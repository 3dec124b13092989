//! Scoped ownership of a run's key in the system under test

use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::adapter::SystemAdapter;

/// Borrows the adapter for the duration of a run and deletes the run's key
/// when dropped.
///
/// The delete is issued on every exit path, including unwinding. Its result
/// is logged and otherwise ignored.
pub struct CleanupGuard<'a, A: SystemAdapter + ?Sized> {
    adapter: &'a mut A,
    key: String,
}

impl<'a, A: SystemAdapter + ?Sized> CleanupGuard<'a, A> {
    pub fn new(adapter: &'a mut A, key: impl Into<String>) -> Self {
        Self {
            adapter,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<A: SystemAdapter + ?Sized> Deref for CleanupGuard<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        self.adapter
    }
}

impl<A: SystemAdapter + ?Sized> DerefMut for CleanupGuard<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        self.adapter
    }
}

impl<A: SystemAdapter + ?Sized> Drop for CleanupGuard<'_, A> {
    fn drop(&mut self) {
        let adapter = &mut *self.adapter;
        let key = self.key.as_str();
        match panic::catch_unwind(AssertUnwindSafe(|| adapter.delete(key))) {
            Ok(Ok(result)) => debug!(key, status = %result.status, "cleanup delete issued"),
            Ok(Err(fault)) => warn!(key, %fault, "cleanup delete failed"),
            Err(_) => warn!(key, "cleanup delete panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::memory::{InMemoryUserService, MemoryAdapter};
    use crate::operations::{FIELD_CONTACT_NUMBER, FIELD_NAME, Payload};

    fn payload() -> Payload {
        Payload::new()
            .with(FIELD_NAME, "n")
            .with(FIELD_CONTACT_NUMBER, "1")
    }

    #[test]
    fn test_guard_deletes_on_drop() {
        let service = InMemoryUserService::new();
        let mut adapter = MemoryAdapter::new(service.clone());
        {
            let mut guard = CleanupGuard::new(&mut adapter, "k");
            guard.create("k", &payload()).unwrap();
            assert!(service.contains("k"));
        }
        assert!(!service.contains("k"));
    }

    #[test]
    fn test_guard_swallows_faults() {
        let service = InMemoryUserService::new();
        let mut adapter = MemoryAdapter::new(service.clone()).fail_after(1);
        {
            let mut guard = CleanupGuard::new(&mut adapter, "k");
            guard.create("k", &payload()).unwrap();
        }
        // the cleanup call itself faulted, so the record survives
        assert!(service.contains("k"));
        assert_eq!(adapter.calls(), 2);
    }

    #[test]
    fn test_guard_runs_during_unwind() {
        let service = InMemoryUserService::new();
        let mut adapter = MemoryAdapter::new(service.clone());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut guard = CleanupGuard::new(&mut adapter, "k");
            guard.create("k", &payload()).unwrap();
            panic!("adapter blew up");
        }));

        assert!(result.is_err());
        assert!(!service.contains("k"));
    }
}
