//! In-memory process launcher for tests, benchmarks and dry runs.
//!
//! Clones share state, so a test keeps one handle while the scheduler owns
//! another.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{IdleProcess, ItemId, ProcessLauncher, SchedulerError};

#[derive(Debug, Default)]
struct LauncherState {
    next_pid: u32,
    live: BTreeMap<u32, ItemId>,
    exited: HashSet<u32>,
    failing: HashSet<ItemId>,
    launches: Vec<ItemId>,
}

/// Launcher whose processes exist only as entries in a shared table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl InMemoryLauncher {
    /// Create an empty launcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later launch for `item` fail.
    pub fn fail_for(&self, item: &ItemId) {
        self.state.lock().failing.insert(item.clone());
    }

    /// Let launches for `item` succeed again.
    pub fn clear_failure(&self, item: &ItemId) {
        self.state.lock().failing.remove(item);
    }

    /// Every successful launch, in order.
    #[must_use]
    pub fn launches(&self) -> Vec<ItemId> {
        self.state.lock().launches.clone()
    }

    /// Items with a live process, sorted.
    #[must_use]
    pub fn live_items(&self) -> Vec<ItemId> {
        let state = self.state.lock();
        let mut items: Vec<ItemId> = state
            .live
            .iter()
            .filter(|(pid, _)| !state.exited.contains(pid))
            .map(|(_, item)| item.clone())
            .collect();
        items.sort();
        items
    }

    /// Mark the live process of `item` as exited on its own.
    ///
    /// Returns `false` if `item` has no live process.
    pub fn simulate_exit(&self, item: &ItemId) -> bool {
        let mut state = self.state.lock();
        let pid = state
            .live
            .iter()
            .find(|(pid, owner)| *owner == item && !state.exited.contains(pid))
            .map(|(pid, _)| *pid);
        match pid {
            Some(pid) => {
                state.exited.insert(pid);
                true
            }
            None => false,
        }
    }
}

impl ProcessLauncher for InMemoryLauncher {
    fn launch(&self, item: &ItemId) -> Result<Box<dyn IdleProcess>, SchedulerError> {
        let mut state = self.state.lock();
        if state.failing.contains(item) {
            return Err(SchedulerError::Launch(format!("{item}: launch refused")));
        }
        state.next_pid += 1;
        let pid = state.next_pid;
        state.live.insert(pid, item.clone());
        state.launches.push(item.clone());
        Ok(Box::new(InMemoryProcess {
            pid,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Handle to a process entry in the launcher table.
#[derive(Debug)]
struct InMemoryProcess {
    pid: u32,
    state: Arc<Mutex<LauncherState>>,
}

impl IdleProcess for InMemoryProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn has_exited(&mut self) -> Result<bool, SchedulerError> {
        let state = self.state.lock();
        Ok(state.exited.contains(&self.pid) || !state.live.contains_key(&self.pid))
    }

    fn terminate(&mut self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        state.live.remove(&self.pid);
        state.exited.remove(&self.pid);
        Ok(())
    }
}
