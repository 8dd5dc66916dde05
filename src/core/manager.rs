//! Id-based command surface over the catalog, queue and scheduler.
//!
//! Every public command follows the same sequence: mutate, run exactly one
//! scheduling pass, then commit. Committing turns the pass report and the
//! before/after difference into [`IdleEvent`]s, saves [`PersistedState`] when
//! the queue, blacklist or cap changed, and only then notifies observers.
//! Observers never run while state is half-updated.
//!
//! Commands whose preconditions are not met are no-ops reported through the
//! return value, never errors.

use crate::core::events::build_event;
use crate::core::{
    Catalog, DropOutcome, ExitReport, IdleEventKind, IdleObserver, IdleQueue, Item, ItemId,
    PassReport, PersistedState, QueuePosition, Scheduler, SchedulerError, StartOutcome,
    StateStore,
};
use crate::runtime::api::IdleSnapshot;

/// State observed before a command, compared at commit time.
struct Baseline {
    queue: Vec<ItemId>,
    running: usize,
}

/// Owner of the idle scheduling state for one account.
pub struct IdleManager {
    scheduler: Scheduler,
    catalog: Catalog,
    queue: IdleQueue,
    observers: Vec<Box<dyn IdleObserver>>,
    store: Option<Box<dyn StateStore>>,
}

impl std::fmt::Debug for IdleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleManager")
            .field("scheduler", &self.scheduler)
            .field("items", &self.catalog.len())
            .field("queue", &self.queue.ids())
            .field("observers", &self.observers.len())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl IdleManager {
    /// Create a manager over `catalog` with an empty queue.
    #[must_use]
    pub fn new(scheduler: Scheduler, catalog: Catalog) -> Self {
        Self {
            scheduler,
            catalog,
            queue: IdleQueue::new(),
            observers: Vec::new(),
            store: None,
        }
    }

    /// Attach a state store used by [`IdleManager::restore`] and after changes.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl IdleObserver + 'static) -> Self {
        self.add_observer(observer);
        self
    }

    /// Register an observer on a live manager.
    pub fn add_observer(&mut self, observer: impl IdleObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Register an already boxed observer.
    pub fn add_boxed_observer(&mut self, observer: Box<dyn IdleObserver>) {
        self.observers.push(observer);
    }

    // ---- persistence --------------------------------------------------------

    /// Load the saved state from the store and apply it.
    ///
    /// Without a store, or with nothing saved, this only runs a pass.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] if the store cannot be read.
    pub fn restore(&mut self) -> Result<usize, SchedulerError> {
        let state = match self.store.as_mut() {
            Some(store) => store.load()?,
            None => None,
        };
        Ok(self.restore_from(state.unwrap_or_default()))
    }

    /// Apply a previously saved state.
    ///
    /// The blacklist is applied first, then the cap (if at least one), then
    /// queue ids are appended in order. Ids missing from the catalog are
    /// dropped silently. Returns how many ids were queued.
    pub fn restore_from(&mut self, state: PersistedState) -> usize {
        let baseline = self.baseline();
        let mut events = Vec::new();

        for id in &state.blacklist {
            if let Some(item) = self.catalog.get_mut(id) {
                if !item.is_blacklisted() {
                    item.set_blacklisted(true);
                    events.push(IdleEventKind::BlacklistChanged {
                        item: id.clone(),
                        blacklisted: true,
                    });
                }
            }
        }

        if let Some(max) = state.max_concurrent.filter(|max| *max >= 1) {
            if matches!(self.scheduler.set_max_concurrent(max), Ok(true)) {
                events.push(IdleEventKind::CapacityChanged {
                    max_concurrent: max,
                });
            }
        }

        let mut queued = 0;
        for id in &state.queue {
            match self.catalog.get_mut(id) {
                Some(item) => {
                    if self.queue.enqueue_back(item) {
                        queued += 1;
                    }
                }
                None => tracing::debug!(item = %id, "restored id not in catalog, dropped"),
            }
        }

        tracing::info!(
            queued,
            dropped = state.queue.len() - queued,
            blacklisted = state.blacklist.len(),
            "idle state restored"
        );
        self.reschedule_and_commit(baseline, events, true);
        queued
    }

    // ---- queue commands -----------------------------------------------------

    /// Insert `id` at the head of the queue.
    pub fn enqueue_front(&mut self, id: &ItemId) -> bool {
        self.enqueue(id, QueuePosition::Front)
    }

    /// Insert `id` at the tail of the queue.
    pub fn enqueue_back(&mut self, id: &ItemId) -> bool {
        self.enqueue(id, QueuePosition::Back)
    }

    /// Insert `id` at `position`. No-op for unknown, queued, blacklisted or
    /// depleted items.
    pub fn enqueue(&mut self, id: &ItemId, position: QueuePosition) -> bool {
        self.enqueue_all(std::slice::from_ref(id), position) == 1
    }

    /// Insert every eligible, not yet queued id.
    ///
    /// With [`QueuePosition::Front`] the inserted block keeps its given order
    /// at the head of the queue. Returns how many ids were inserted.
    pub fn enqueue_all(&mut self, ids: &[ItemId], position: QueuePosition) -> usize {
        let baseline = self.baseline();
        let mut inserted = 0;
        for id in ids {
            let Some(item) = self.catalog.get_mut(id) else {
                tracing::debug!(item = %id, "enqueue of unknown item ignored");
                continue;
            };
            let added = match position {
                QueuePosition::Front => self.queue.insert_at(item, inserted),
                QueuePosition::Back => self.queue.enqueue_back(item),
            };
            if added {
                inserted += 1;
            }
        }
        if inserted > 0 {
            tracing::info!(inserted, ?position, "items enqueued");
        }
        self.reschedule_and_commit(baseline, Vec::new(), false);
        inserted
    }

    /// Remove `id` from the queue, stopping its worker.
    pub fn dequeue(&mut self, id: &ItemId) -> bool {
        self.dequeue_all(std::slice::from_ref(id)) == 1
    }

    /// Remove every listed member. Returns how many were removed.
    pub fn dequeue_all(&mut self, ids: &[ItemId]) -> usize {
        let baseline = self.baseline();
        let mut events = Vec::new();
        let mut removed = 0;
        for id in ids {
            let Some(item) = self.catalog.get_mut(id) else {
                continue;
            };
            if !self.queue.dequeue(item) {
                continue;
            }
            removed += 1;
            if item.stop_worker() {
                events.push(IdleEventKind::WorkerStopped { item: id.clone() });
            }
        }
        if removed > 0 {
            tracing::info!(removed, "items dequeued");
        }
        self.reschedule_and_commit(baseline, events, false);
        removed
    }

    /// Move `id` one step toward the head.
    ///
    /// Slots are not reassigned: a promoted waiting item only starts once a
    /// running one finishes.
    pub fn promote(&mut self, id: &ItemId) -> bool {
        let baseline = self.baseline();
        let moved = self.queue.promote(id);
        self.reschedule_and_commit(baseline, Vec::new(), false);
        moved
    }

    /// Move `id` one step toward the tail.
    pub fn demote(&mut self, id: &ItemId) -> bool {
        let baseline = self.baseline();
        let moved = self.queue.demote(id);
        self.reschedule_and_commit(baseline, Vec::new(), false);
        moved
    }

    /// Whether [`IdleManager::promote`] would move `id`.
    #[must_use]
    pub fn can_promote(&self, id: &ItemId) -> bool {
        self.queue.can_shift(id, crate::core::Direction::Up)
    }

    /// Whether [`IdleManager::demote`] would move `id`.
    #[must_use]
    pub fn can_demote(&self, id: &ItemId) -> bool {
        self.queue.can_shift(id, crate::core::Direction::Down)
    }

    // ---- scheduler controls -------------------------------------------------

    /// Switch idling on or off. Switching off stops every worker and keeps
    /// the queue.
    pub fn set_active(&mut self, active: bool) {
        let baseline = self.baseline();
        let mut events = Vec::new();
        if self.scheduler.set_active(active) {
            tracing::info!(active, "idling switched");
            events.push(IdleEventKind::ActivityChanged { active });
        }
        self.reschedule_and_commit(baseline, events, false);
    }

    /// Whether idling is switched on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.scheduler.is_enabled()
    }

    /// Whether at least one worker is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.running_count() > 0
    }

    /// Change the concurrency cap.
    ///
    /// Lowering it below the running count stops nobody; admissions resume
    /// once enough workers finish.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] for zero. State is left
    /// untouched in that case.
    pub fn set_max_concurrent(&mut self, max_concurrent: usize) -> Result<(), SchedulerError> {
        let baseline = self.baseline();
        let mut events = Vec::new();
        let changed = self.scheduler.set_max_concurrent(max_concurrent)?;
        if changed {
            tracing::info!(max_concurrent, "concurrency cap changed");
            events.push(IdleEventKind::CapacityChanged { max_concurrent });
        }
        self.reschedule_and_commit(baseline, events, changed);
        Ok(())
    }

    /// Current concurrency cap.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.scheduler.max_concurrent()
    }

    /// Feed the external availability signal.
    pub fn on_availability_changed(&mut self, available: bool) {
        let baseline = self.baseline();
        let mut events = Vec::new();
        if self.scheduler.set_available(available) {
            tracing::info!(available, "availability changed");
            events.push(IdleEventKind::AvailabilityChanged { available });
        }
        self.reschedule_and_commit(baseline, events, false);
    }

    /// Last availability signal.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.scheduler.is_available()
    }

    // ---- per-item commands --------------------------------------------------

    /// Start one item's worker outside queue order.
    ///
    /// Availability, the activity flag, eligibility and a free slot are all
    /// required.
    pub fn start_item(&mut self, id: &ItemId) -> StartOutcome {
        let baseline = self.baseline();
        let outcome = self.scheduler.start_item(&mut self.catalog, id);
        let mut events = Vec::new();
        match &outcome {
            StartOutcome::Started => {
                events.push(IdleEventKind::WorkerStarted { item: id.clone() });
            }
            StartOutcome::Failed(reason) => events.push(IdleEventKind::LaunchFailed {
                item: id.clone(),
                reason: reason.clone(),
            }),
            other => tracing::debug!(item = %id, outcome = ?other, "manual start rejected"),
        }
        self.reschedule_and_commit(baseline, events, false);
        outcome
    }

    /// Stop one item's worker. A queued item is also dequeued, returning it
    /// to idle.
    pub fn stop_item(&mut self, id: &ItemId) -> bool {
        let baseline = self.baseline();
        let mut events = Vec::new();
        let mut changed = false;
        if let Some(item) = self.catalog.get_mut(id) {
            if item.stop_worker() {
                events.push(IdleEventKind::WorkerStopped { item: id.clone() });
                changed = true;
            }
            changed |= self.queue.dequeue(item);
        }
        self.reschedule_and_commit(baseline, events, false);
        changed
    }

    /// Add or remove `id` from the blacklist. Blacklisting stops the worker
    /// and evicts the item from the queue; un-blacklisting never re-enqueues.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownItem`] if `id` is not in the catalog.
    pub fn set_blacklisted(&mut self, id: &ItemId, blacklisted: bool) -> Result<bool, SchedulerError> {
        let baseline = self.baseline();
        let item = self
            .catalog
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownItem(id.clone()))?;
        let changed = item.is_blacklisted() != blacklisted;
        item.set_blacklisted(blacklisted);
        let mut events = Vec::new();
        if changed {
            tracing::info!(item = %id, blacklisted, "blacklist updated");
            events.push(IdleEventKind::BlacklistChanged {
                item: id.clone(),
                blacklisted,
            });
        }
        self.reschedule_and_commit(baseline, events, changed);
        Ok(changed)
    }

    /// Blacklisted ids, sorted.
    #[must_use]
    pub fn blacklisted_ids(&self) -> Vec<ItemId> {
        self.catalog.blacklisted_ids()
    }

    /// Add an item or refresh an existing one's title and remaining units.
    ///
    /// An existing item keeps its worker and queue position. Setting the
    /// remaining units of a depleted item above zero makes it eligible again
    /// without re-queueing it. Returns `true` if the item is new.
    pub fn upsert_item(&mut self, id: &ItemId, title: &str, remaining_units: u32) -> bool {
        let baseline = self.baseline();
        let mut events = Vec::new();
        let inserted = match self.catalog.get_mut(id) {
            Some(item) => {
                item.set_title(title);
                if item.remaining_units() != remaining_units {
                    let was_running = item.is_running();
                    let was_depleted = item.is_depleted();
                    item.reset_remaining(remaining_units);
                    if was_running && !item.is_running() {
                        events.push(IdleEventKind::WorkerStopped { item: id.clone() });
                    }
                    if !was_depleted && item.is_depleted() {
                        events.push(IdleEventKind::ItemDepleted { item: id.clone() });
                    }
                }
                false
            }
            None => {
                self.catalog
                    .insert(Item::new(id.clone(), title, remaining_units));
                true
            }
        };
        self.reschedule_and_commit(baseline, events, false);
        inserted
    }

    /// Stop, dequeue and forget an item.
    pub fn remove_item(&mut self, id: &ItemId) -> bool {
        let baseline = self.baseline();
        let mut events = Vec::new();
        let Some(mut item) = self.catalog.remove(id) else {
            return false;
        };
        self.queue.dequeue(&mut item);
        if item.stop_worker() {
            events.push(IdleEventKind::WorkerStopped { item: id.clone() });
        }
        let persist = item.is_blacklisted();
        tracing::info!(item = %id, "item removed");
        drop(item);
        self.reschedule_and_commit(baseline, events, persist);
        true
    }

    /// Record `count` units consumed by `id`.
    ///
    /// Depletion stops the worker; the same pass evicts the item and backfills
    /// the freed slot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownItem`] if `id` is not in the catalog.
    pub fn record_drops(&mut self, id: &ItemId, count: u32) -> Result<DropOutcome, SchedulerError> {
        let baseline = self.baseline();
        let item = self
            .catalog
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownItem(id.clone()))?;
        let was_running = item.is_running();
        let outcome = item.consume(count);
        let mut events = Vec::new();
        if outcome == DropOutcome::Depleted {
            if was_running {
                events.push(IdleEventKind::WorkerStopped { item: id.clone() });
            }
            events.push(IdleEventKind::ItemDepleted { item: id.clone() });
        }
        self.reschedule_and_commit(baseline, events, false);
        Ok(outcome)
    }

    /// Detach workers whose process exited on its own and backfill the freed
    /// slots in queue order.
    ///
    /// The exited items themselves sit out this pass and are reconsidered by
    /// the next one.
    pub fn reap_exited(&mut self) -> Vec<ExitReport> {
        let baseline = self.baseline();
        let mut reports = Vec::new();
        for id in self.catalog.running_ids() {
            if let Some(report) = self
                .catalog
                .get_mut(&id)
                .and_then(|item| item.worker_mut().poll_exit(&id))
            {
                tracing::warn!(item = %id, pid = ?report.pid, "idle process exited");
                reports.push(report);
            }
        }
        if !reports.is_empty() {
            let exited: Vec<ItemId> = reports.iter().map(|r| r.item.clone()).collect();
            let events = exited
                .iter()
                .map(|item| IdleEventKind::WorkerExited { item: item.clone() })
                .collect();
            let report =
                self.scheduler
                    .reschedule_skipping(&mut self.catalog, &mut self.queue, &exited);
            self.commit(baseline, events, report, false);
        }
        reports
    }

    /// Stop every worker and switch idling off. The queue is kept.
    pub fn shutdown(&mut self) {
        tracing::info!(running = self.running_count(), "idle manager shutting down");
        self.set_active(false);
    }

    // ---- queries ------------------------------------------------------------

    /// Workers running right now.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.catalog.running_count()
    }

    /// Queue contents in priority order.
    #[must_use]
    pub fn queue(&self) -> &[ItemId] {
        self.queue.ids()
    }

    /// Look up an item.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.catalog.get(id)
    }

    /// Read access to the catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read access to the scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Serializable view of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> IdleSnapshot {
        IdleSnapshot::capture(self)
    }

    /// State that would be written to the store now.
    #[must_use]
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            queue: self.queue.ids().to_vec(),
            blacklist: self.catalog.blacklisted_ids(),
            max_concurrent: Some(self.scheduler.max_concurrent()),
        }
    }

    // ---- commit -------------------------------------------------------------

    fn baseline(&self) -> Baseline {
        Baseline {
            queue: self.queue.ids().to_vec(),
            running: self.catalog.running_count(),
        }
    }

    fn reschedule_and_commit(
        &mut self,
        baseline: Baseline,
        events: Vec<IdleEventKind>,
        persist: bool,
    ) {
        let report = self.scheduler.reschedule(&mut self.catalog, &mut self.queue);
        self.commit(baseline, events, report, persist);
    }

    fn commit(
        &mut self,
        baseline: Baseline,
        mut events: Vec<IdleEventKind>,
        report: PassReport,
        persist: bool,
    ) {
        events.extend(
            report
                .evicted
                .into_iter()
                .map(|item| IdleEventKind::ItemEvicted { item }),
        );
        events.extend(
            report
                .stopped
                .into_iter()
                .map(|item| IdleEventKind::WorkerStopped { item }),
        );
        events.extend(
            report
                .started
                .into_iter()
                .map(|item| IdleEventKind::WorkerStarted { item }),
        );
        events.extend(
            report
                .failed
                .into_iter()
                .map(|(item, reason)| IdleEventKind::LaunchFailed { item, reason }),
        );

        let queue_changed = self.queue.ids() != baseline.queue.as_slice();
        if queue_changed {
            events.push(IdleEventKind::QueueChanged {
                queue: self.queue.ids().to_vec(),
            });
        }
        let running = self.catalog.running_count();
        if running != baseline.running {
            events.push(IdleEventKind::RunningCountChanged {
                running,
                max_concurrent: self.scheduler.max_concurrent(),
            });
        }

        if persist || queue_changed {
            self.persist();
        }
        self.emit(events);
    }

    fn persist(&mut self) {
        let state = self.persisted_state();
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(e) = store.save(&state) {
            tracing::warn!(error = %e, "failed to persist idle state");
        }
    }

    fn emit(&mut self, events: Vec<IdleEventKind>) {
        if self.observers.is_empty() {
            return;
        }
        for kind in events {
            let event = build_event(kind);
            for observer in &mut self.observers {
                observer.notify(&event);
            }
        }
    }
}
