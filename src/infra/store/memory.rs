//! In-memory state store.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{PersistedState, SchedulerError, StateStore};

/// Store that keeps the last saved state in memory. Clones share it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    state: Arc<Mutex<Option<PersistedState>>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `state`.
    #[must_use]
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
            saves: Arc::default(),
        }
    }

    /// Last saved state.
    #[must_use]
    pub fn saved(&self) -> Option<PersistedState> {
        self.state.lock().clone()
    }

    /// Number of saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&mut self) -> Result<Option<PersistedState>, SchedulerError> {
        Ok(self.state.lock().clone())
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), SchedulerError> {
        *self.state.lock() = Some(state.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
