//! Item catalog: the full set of known items, keyed by id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Item, ItemId};

/// Aggregate counters over the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTotals {
    /// Number of known items.
    pub items: usize,
    /// Sum of remaining units across all items.
    pub remaining_units: u64,
}

/// Owner of every [`Item`] the scheduler may act on.
#[derive(Debug, Default)]
pub struct Catalog {
    items: HashMap<ItemId, Item>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning any item previously stored under the same id.
    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id().clone(), item)
    }

    /// Remove an item. Dropping the returned value terminates its process.
    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        self.items.remove(id)
    }

    /// Look up an item.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Look up an item for mutation.
    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    /// Whether `id` is known.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate items in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Ids sorted ascending, for stable listings.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.items.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of items whose worker is running.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.items.values().filter(|item| item.is_running()).count()
    }

    /// Ids of running items, sorted ascending.
    #[must_use]
    pub fn running_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .items
            .values()
            .filter(|item| item.is_running())
            .map(|item| item.id().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Ids of blacklisted items, sorted ascending.
    #[must_use]
    pub fn blacklisted_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .items
            .values()
            .filter(|item| item.is_blacklisted())
            .map(|item| item.id().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Item count and total remaining units.
    #[must_use]
    pub fn totals(&self) -> CatalogTotals {
        CatalogTotals {
            items: self.items.len(),
            remaining_units: self
                .items
                .values()
                .map(|item| u64::from(item.remaining_units()))
                .sum(),
        }
    }
}
