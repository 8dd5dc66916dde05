//! Persisted scheduler state and the storage seam.
//!
//! Only queue order, blacklist membership and the cap survive a restart.
//! Running flags are never stored; workers are re-admitted by the first pass
//! after restore.

use serde::{Deserialize, Serialize};

use crate::core::{ItemId, SchedulerError};

/// Durable scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Queue contents in priority order.
    #[serde(default)]
    pub queue: Vec<ItemId>,
    /// Blacklisted item ids.
    #[serde(default)]
    pub blacklist: Vec<ItemId>,
    /// Concurrency cap, if one was saved.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

/// Storage backend for [`PersistedState`].
pub trait StateStore: Send {
    /// Load the last saved state. A store with nothing saved yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] on I/O or decode failure.
    fn load(&mut self) -> Result<Option<PersistedState>, SchedulerError>;

    /// Replace the saved state.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] on I/O or encode failure.
    fn save(&mut self, state: &PersistedState) -> Result<(), SchedulerError>;
}
