//! Serializable views of the idle state for UI and API layers.

use serde::{Deserialize, Serialize};

use crate::core::{CatalogTotals, IdleManager, Item, ItemId, ItemState};

/// One item as shown to a UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Item identifier.
    pub id: ItemId,
    /// Display title.
    pub title: String,
    /// Units still to be collected.
    pub remaining_units: u32,
    /// Blacklist flag.
    pub blacklisted: bool,
    /// Zero-based queue position, if queued.
    pub queue_position: Option<usize>,
    /// Whether a worker process is running.
    pub running: bool,
    /// OS process id of the worker.
    pub pid: Option<u32>,
    /// Derived scheduling state.
    pub state: ItemState,
}

/// Whole-manager view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleSnapshot {
    /// Queue contents in priority order.
    pub queue: Vec<ItemId>,
    /// Running item ids, sorted.
    pub running: Vec<ItemId>,
    /// Number of running workers.
    pub running_count: usize,
    /// Concurrency cap.
    pub max_concurrent: usize,
    /// Whether idling is switched on.
    pub enabled: bool,
    /// Last availability signal.
    pub available: bool,
    /// Catalog counters.
    pub totals: CatalogTotals,
    /// Every item, sorted by id.
    pub items: Vec<ItemSnapshot>,
}

impl IdleSnapshot {
    /// Capture the current state of `manager`.
    #[must_use]
    pub fn capture(manager: &IdleManager) -> Self {
        let catalog = manager.catalog();
        let queue = manager.queue().to_vec();
        let items = catalog
            .sorted_ids()
            .iter()
            .filter_map(|id| catalog.get(id))
            .map(|item| ItemSnapshot::capture(item, &queue))
            .collect();
        Self {
            running: catalog.running_ids(),
            running_count: catalog.running_count(),
            max_concurrent: manager.max_concurrent(),
            enabled: manager.is_enabled(),
            available: manager.is_available(),
            totals: catalog.totals(),
            queue,
            items,
        }
    }

    /// Whether any worker is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.running_count > 0
    }
}

impl ItemSnapshot {
    fn capture(item: &Item, queue: &[ItemId]) -> Self {
        Self {
            id: item.id().clone(),
            title: item.title().to_owned(),
            remaining_units: item.remaining_units(),
            blacklisted: item.is_blacklisted(),
            queue_position: queue.iter().position(|id| id == item.id()),
            running: item.is_running(),
            pid: item.worker().pid(),
            state: item.state(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// No worker runs while the client is unavailable.
    pub ok: bool,
    /// Number of running workers.
    pub running: usize,
    /// Concurrency cap.
    pub max_concurrent: usize,
}

/// Build a health payload from a snapshot.
#[must_use]
pub const fn health(snapshot: &IdleSnapshot) -> Health {
    Health {
        ok: snapshot.available || snapshot.running_count == 0,
        running: snapshot.running_count,
        max_concurrent: snapshot.max_concurrent,
    }
}
