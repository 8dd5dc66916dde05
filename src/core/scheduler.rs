//! Scheduling pass engine.
//!
//! The [`Scheduler`] holds the concurrency cap, the activity flag and the
//! availability signal, and decides in one pass which queued items get a
//! running worker:
//!
//! 1. Ineligible entries (blacklisted, depleted or unknown) are purged from the
//!    queue and any ineligible running worker is stopped.
//! 2. If the scheduler is paused or the external precondition is false, every
//!    running worker is stopped. Queue membership is untouched.
//! 3. Otherwise free slots (`max_concurrent - running`) are granted in queue
//!    order to items that are not running yet.
//!
//! Running items are never stopped to make room for others, and lowering the
//! cap below the running count only blocks new admissions until enough
//! workers finish.
//!
//! The scheduler does not own items or queue storage; callers pass the
//! [`Catalog`] and [`IdleQueue`] into every pass.

use std::sync::Arc;

use crate::core::{Catalog, IdleQueue, ItemId, ProcessLauncher, SchedulerError, StartOutcome};

/// What a scheduling pass (or a manual command) changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Items whose worker was launched.
    pub started: Vec<ItemId>,
    /// Items whose worker was stopped.
    pub stopped: Vec<ItemId>,
    /// Items purged from the queue because they became ineligible.
    pub evicted: Vec<ItemId>,
    /// Items whose launch failed, with the reason.
    pub failed: Vec<(ItemId, String)>,
}

impl PassReport {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.started.is_empty()
            && self.stopped.is_empty()
            && self.evicted.is_empty()
            && self.failed.is_empty()
    }
}

/// Concurrency-bounded admission control over the idle queue.
#[derive(Clone)]
pub struct Scheduler {
    max_concurrent: usize,
    active: bool,
    available: bool,
    launcher: Arc<dyn ProcessLauncher>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("max_concurrent", &self.max_concurrent)
            .field("active", &self.active)
            .field("available", &self.available)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a paused scheduler that considers the precondition unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if `max_concurrent` is zero.
    pub fn new(
        max_concurrent: usize,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Result<Self, SchedulerError> {
        if max_concurrent == 0 {
            return Err(SchedulerError::InvalidConcurrency(max_concurrent));
        }
        Ok(Self {
            max_concurrent,
            active: false,
            available: false,
            launcher,
        })
    }

    /// Set the initial activity flag.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the initial availability signal.
    #[must_use]
    pub const fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Current concurrency cap.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Whether the scheduler is switched on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.active
    }

    /// Last availability signal.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Whether new workers may be started at all.
    #[must_use]
    pub const fn is_admitting(&self) -> bool {
        self.active && self.available
    }

    /// Switch admission on or off. Returns whether the flag changed.
    pub fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }

    /// Record the external availability signal. Returns whether it changed.
    pub fn set_available(&mut self, available: bool) -> bool {
        let changed = self.available != available;
        self.available = available;
        changed
    }

    /// Change the concurrency cap. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if `max_concurrent` is zero.
    pub fn set_max_concurrent(&mut self, max_concurrent: usize) -> Result<bool, SchedulerError> {
        if max_concurrent == 0 {
            return Err(SchedulerError::InvalidConcurrency(max_concurrent));
        }
        let changed = self.max_concurrent != max_concurrent;
        self.max_concurrent = max_concurrent;
        Ok(changed)
    }

    /// Slots left under the cap. Zero while running exceeds a lowered cap.
    #[must_use]
    pub fn free_slots(&self, catalog: &Catalog) -> usize {
        self.max_concurrent.saturating_sub(catalog.running_count())
    }

    /// Launcher used for every start.
    #[must_use]
    pub fn launcher(&self) -> &dyn ProcessLauncher {
        self.launcher.as_ref()
    }

    /// Start one item's worker outside queue order, subject to every
    /// admission precondition.
    pub fn start_item(&self, catalog: &mut Catalog, id: &ItemId) -> StartOutcome {
        if !self.is_admitting() {
            return StartOutcome::Unavailable;
        }
        let free = self.free_slots(catalog);
        let Some(item) = catalog.get_mut(id) else {
            return StartOutcome::Ineligible;
        };
        if item.is_running() {
            return StartOutcome::AlreadyRunning;
        }
        if !item.is_eligible() {
            return StartOutcome::Ineligible;
        }
        if free == 0 {
            return StartOutcome::NoFreeSlot;
        }
        item.start_worker(self.launcher.as_ref())
    }

    /// Run one scheduling pass over `queue`.
    pub fn reschedule(&self, catalog: &mut Catalog, queue: &mut IdleQueue) -> PassReport {
        self.reschedule_skipping(catalog, queue, &[])
    }

    /// Run one scheduling pass that leaves the `skip` ids unstarted.
    ///
    /// Skipped items keep their queue position and are reconsidered by the
    /// next pass.
    pub fn reschedule_skipping(
        &self,
        catalog: &mut Catalog,
        queue: &mut IdleQueue,
        skip: &[ItemId],
    ) -> PassReport {
        let mut report = Self::purge(catalog, queue);

        if !self.is_admitting() {
            for id in catalog.running_ids() {
                if let Some(item) = catalog.get_mut(&id) {
                    if item.stop_worker() {
                        report.stopped.push(id);
                    }
                }
            }
            if !report.stopped.is_empty() {
                tracing::info!(
                    stopped = report.stopped.len(),
                    active = self.active,
                    available = self.available,
                    "idling paused"
                );
            }
            return report;
        }

        let mut free = self.free_slots(catalog);
        for id in queue.iter() {
            if free == 0 {
                break;
            }
            let Some(item) = catalog.get_mut(id) else {
                continue;
            };
            if item.is_running() || skip.contains(id) {
                continue;
            }
            match item.start_worker(self.launcher.as_ref()) {
                StartOutcome::Started => {
                    free -= 1;
                    report.started.push(id.clone());
                }
                StartOutcome::Failed(reason) => report.failed.push((id.clone(), reason)),
                _ => {}
            }
        }

        tracing::debug!(
            started = report.started.len(),
            failed = report.failed.len(),
            running = catalog.running_count(),
            max_concurrent = self.max_concurrent,
            "scheduling pass complete"
        );
        report
    }

    /// Drop ineligible entries from the queue and stop ineligible workers.
    fn purge(catalog: &mut Catalog, queue: &mut IdleQueue) -> PassReport {
        let mut report = PassReport::default();

        let evicted =
            queue.remove_all_matching(|id| catalog.get(id).is_none_or(|item| !item.is_eligible()));
        for id in evicted {
            if let Some(item) = catalog.get_mut(&id) {
                item.set_queued(false);
                if item.stop_worker() {
                    report.stopped.push(id.clone());
                }
            }
            tracing::info!(item = %id, "evicted from idle queue");
            report.evicted.push(id);
        }

        for id in catalog.running_ids() {
            if let Some(item) = catalog.get_mut(&id) {
                if !item.is_eligible() && item.stop_worker() {
                    report.stopped.push(id);
                }
            }
        }

        report
    }
}
