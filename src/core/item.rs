//! Item records and their derived scheduling state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{ProcessLauncher, StartOutcome, WorkerProcess};

/// Stable external identifier of an item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an external identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scheduling state derived from queue membership and the worker's running flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Not queued, not running.
    Idle,
    /// Queued, waiting for a free slot.
    QueuedWaiting,
    /// Queued and holding a slot.
    QueuedRunning,
    /// Running from a manual start, outside the queue.
    ManualRunning,
    /// No remaining units; never scheduled again until reset.
    Depleted,
}

/// Outcome of recording consumed units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Units remain.
    Remaining(u32),
    /// This call brought the counter to zero; the worker has been stopped.
    Depleted,
    /// The counter was already zero.
    AlreadyDepleted,
}

/// One item accumulating a decrementing resource.
#[derive(Debug)]
pub struct Item {
    id: ItemId,
    title: String,
    remaining_units: u32,
    blacklisted: bool,
    queued: bool,
    worker: WorkerProcess,
}

impl Item {
    /// Create an item with no queue membership and a stopped worker.
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>, remaining_units: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            remaining_units,
            blacklisted: false,
            queued: false,
            worker: WorkerProcess::new(),
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Units still to be collected.
    #[must_use]
    pub const fn remaining_units(&self) -> u32 {
        self.remaining_units
    }

    /// Whether the item is excluded from ever holding a slot.
    #[must_use]
    pub const fn is_blacklisted(&self) -> bool {
        self.blacklisted
    }

    /// Whether the item is a member of the idle queue.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        self.queued
    }

    /// Whether the remaining counter reached zero.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.remaining_units == 0
    }

    /// Whether the item may be queued or started at all.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        !self.blacklisted && !self.is_depleted()
    }

    /// Whether the worker currently has a process.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Read access to the worker.
    #[must_use]
    pub const fn worker(&self) -> &WorkerProcess {
        &self.worker
    }

    /// Derived scheduling state.
    #[must_use]
    pub fn state(&self) -> ItemState {
        match (self.is_depleted(), self.queued, self.is_running()) {
            (true, _, _) => ItemState::Depleted,
            (false, true, true) => ItemState::QueuedRunning,
            (false, true, false) => ItemState::QueuedWaiting,
            (false, false, true) => ItemState::ManualRunning,
            (false, false, false) => ItemState::Idle,
        }
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub(crate) const fn set_queued(&mut self, queued: bool) {
        self.queued = queued;
    }

    pub(crate) const fn set_blacklisted(&mut self, blacklisted: bool) {
        self.blacklisted = blacklisted;
    }

    /// Overwrite the remaining counter from an external source.
    ///
    /// Setting zero stops the worker, like a depletion.
    pub(crate) fn reset_remaining(&mut self, remaining_units: u32) {
        self.remaining_units = remaining_units;
        if remaining_units == 0 {
            self.worker.stop();
        }
    }

    pub(crate) fn start_worker(&mut self, launcher: &dyn ProcessLauncher) -> StartOutcome {
        if self.blacklisted {
            return StartOutcome::Ineligible;
        }
        self.worker.start(&self.id, self.remaining_units, launcher)
    }

    pub(crate) fn stop_worker(&mut self) -> bool {
        self.worker.stop()
    }

    pub(crate) const fn worker_mut(&mut self) -> &mut WorkerProcess {
        &mut self.worker
    }

    /// Decrement the counter by `count` consumed units.
    ///
    /// Reaching zero forces the worker to stop.
    pub(crate) fn consume(&mut self, count: u32) -> DropOutcome {
        if self.is_depleted() {
            return DropOutcome::AlreadyDepleted;
        }
        self.remaining_units = self.remaining_units.saturating_sub(count);
        if self.remaining_units > 0 {
            return DropOutcome::Remaining(self.remaining_units);
        }
        self.worker.stop();
        tracing::info!(item = %self.id, "item depleted");
        DropOutcome::Depleted
    }
}
