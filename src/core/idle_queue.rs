//! Ordered idle queue.
//!
//! Position is priority: index 0 is served first when a slot frees up. Order
//! only changes through explicit commands (insert at either end, remove,
//! shift by one); nothing re-sorts the queue by any other key.
//!
//! The queue stores ids and keeps each [`Item`]'s `queued` flag in sync with
//! membership. Every mutation is expected to be followed by a scheduling pass;
//! the queue itself never starts or stops workers.

use serde::{Deserialize, Serialize};

use crate::core::{Item, ItemId};

/// Where an enqueued item lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePosition {
    /// Head of the queue (highest priority).
    Front,
    /// Tail of the queue.
    Back,
}

/// Direction of a one-step reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward the head (higher priority).
    Up,
    /// Toward the tail (lower priority).
    Down,
}

/// FIFO queue of items awaiting or holding a worker slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdleQueue {
    entries: Vec<ItemId>,
}

impl IdleQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is queued.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains(id)
    }

    /// Zero-based position of `id`.
    #[must_use]
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.entries.iter().position(|e| e == id)
    }

    /// Queue contents in priority order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.entries
    }

    /// Iterate in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.entries.iter()
    }

    /// Insert at the head. See [`IdleQueue::enqueue`].
    pub fn enqueue_front(&mut self, item: &mut Item) -> bool {
        self.enqueue(item, QueuePosition::Front)
    }

    /// Insert at the tail. See [`IdleQueue::enqueue`].
    pub fn enqueue_back(&mut self, item: &mut Item) -> bool {
        self.enqueue(item, QueuePosition::Back)
    }

    /// Insert `item` at `position`.
    ///
    /// No-op (returns `false`) if the item is already queued, blacklisted or
    /// depleted.
    pub fn enqueue(&mut self, item: &mut Item, position: QueuePosition) -> bool {
        let index = match position {
            QueuePosition::Front => 0,
            QueuePosition::Back => self.entries.len(),
        };
        self.insert_at(item, index)
    }

    /// Insert `item` at `index` (clamped to the queue length).
    pub(crate) fn insert_at(&mut self, item: &mut Item, index: usize) -> bool {
        if !item.is_eligible() || self.contains(item.id()) {
            tracing::debug!(
                item = %item.id(),
                blacklisted = item.is_blacklisted(),
                depleted = item.is_depleted(),
                "enqueue ignored"
            );
            return false;
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, item.id().clone());
        item.set_queued(true);
        true
    }

    /// Remove `item` if present and clear its `queued` flag.
    ///
    /// Returns `false` for a non-member. The caller is responsible for freeing
    /// the item's slot if its worker was running.
    pub fn dequeue(&mut self, item: &mut Item) -> bool {
        let removed = self.remove_id(item.id());
        item.set_queued(false);
        removed
    }

    /// Whether `id` can move one step in `direction`.
    #[must_use]
    pub fn can_shift(&self, id: &ItemId, direction: Direction) -> bool {
        if self.entries.len() < 2 {
            return false;
        }
        match (self.position(id), direction) {
            (None, _) => false,
            (Some(idx), Direction::Up) => idx > 0,
            (Some(idx), Direction::Down) => idx + 1 < self.entries.len(),
        }
    }

    /// Swap `id` with its neighbour in `direction`.
    ///
    /// Returns `false` (not applicable) at the respective boundary, for a
    /// non-member, or when fewer than two items are queued.
    pub fn shift(&mut self, id: &ItemId, direction: Direction) -> bool {
        if !self.can_shift(id, direction) {
            return false;
        }
        let Some(idx) = self.position(id) else {
            return false;
        };
        let other = match direction {
            Direction::Up => idx - 1,
            Direction::Down => idx + 1,
        };
        self.entries.swap(idx, other);
        true
    }

    /// Move `id` one step toward the head.
    pub fn promote(&mut self, id: &ItemId) -> bool {
        self.shift(id, Direction::Up)
    }

    /// Move `id` one step toward the tail.
    pub fn demote(&mut self, id: &ItemId) -> bool {
        self.shift(id, Direction::Down)
    }

    /// Remove every entry matching `predicate`, preserving the order of the
    /// rest. Returns the removed ids in their former order.
    ///
    /// Callers clear the `queued` flag of the removed items.
    pub fn remove_all_matching<F>(&mut self, mut predicate: F) -> Vec<ItemId>
    where
        F: FnMut(&ItemId) -> bool,
    {
        let mut removed = Vec::new();
        self.entries.retain(|id| {
            if predicate(id) {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub(crate) fn remove_id(&mut self, id: &ItemId) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }
}
