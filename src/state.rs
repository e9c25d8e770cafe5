//! The shared per-service state store.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::models::ServiceState;

/// Map of service name to its last-observed state, guarded by a single
/// lock.
///
/// The lock covers only the read-modify-write of an entry; probe execution
/// and notification delivery always happen outside it. Entries are created
/// lazily on a service's first cycle and live until the store is dropped
/// with the watchdog. Keys are the stable service names from config, never
/// anything identity-based.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: Mutex<HashMap<String, ServiceState>>,
}

impl StateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the named service's state,
    /// creating a default entry on first use.
    pub fn with_state<R>(&self, service_name: &str, f: impl FnOnce(&mut ServiceState) -> R) -> R {
        let mut states = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(service_name.to_string()).or_default();
        f(state)
    }

    /// Returns a snapshot of the named service's state, if one exists yet.
    pub fn get(&self, service_name: &str) -> Option<ServiceState> {
        let states = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(service_name).cloned()
    }
}
