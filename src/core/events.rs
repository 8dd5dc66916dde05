//! Change notifications.
//!
//! Every committed command produces a batch of [`IdleEvent`]s that is fanned
//! out to the registered [`IdleObserver`]s after the state change is complete.
//! Observers only read; they never call back into the manager.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::ItemId;
use crate::util::clock::now_ms;

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdleEventKind {
    /// Queue membership or order changed. Carries the full ordered list.
    QueueChanged {
        /// Queue contents in priority order.
        queue: Vec<ItemId>,
    },
    /// Number of running workers changed.
    RunningCountChanged {
        /// Workers running now.
        running: usize,
        /// Cap in effect.
        max_concurrent: usize,
    },
    /// A worker process was launched.
    WorkerStarted {
        /// Affected item.
        item: ItemId,
    },
    /// A worker process was stopped by the scheduler or a command.
    WorkerStopped {
        /// Affected item.
        item: ItemId,
    },
    /// Launching a worker process failed.
    LaunchFailed {
        /// Affected item.
        item: ItemId,
        /// Launcher error.
        reason: String,
    },
    /// A worker process exited without being stopped.
    WorkerExited {
        /// Affected item.
        item: ItemId,
    },
    /// The item ran out of remaining units.
    ItemDepleted {
        /// Affected item.
        item: ItemId,
    },
    /// The item was purged from the queue as ineligible.
    ItemEvicted {
        /// Affected item.
        item: ItemId,
    },
    /// The availability precondition flipped.
    AvailabilityChanged {
        /// New value.
        available: bool,
    },
    /// The scheduler was switched on or off.
    ActivityChanged {
        /// New value.
        active: bool,
    },
    /// The concurrency cap changed.
    CapacityChanged {
        /// New cap.
        max_concurrent: usize,
    },
    /// An item joined or left the blacklist.
    BlacklistChanged {
        /// Affected item.
        item: ItemId,
        /// New value.
        blacklisted: bool,
    },
}

/// A notification with identity and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleEvent {
    /// Unique event id.
    pub event_id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at_ms: u128,
    /// Payload.
    #[serde(flatten)]
    pub kind: IdleEventKind,
}

/// Receiver of change notifications.
pub trait IdleObserver: Send {
    /// Handle one event.
    fn notify(&mut self, event: &IdleEvent);
}

impl<O: IdleObserver> IdleObserver for Arc<Mutex<O>> {
    fn notify(&mut self, event: &IdleEvent) {
        self.lock().notify(event);
    }
}

/// Bounded in-memory event log for testing and UI polling.
#[derive(Debug)]
pub struct InMemoryObserver {
    events: VecDeque<IdleEvent>,
    max_events: usize,
}

impl InMemoryObserver {
    /// Create an observer that keeps the last `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Create a shareable observer; register a clone with the manager.
    #[must_use]
    pub fn shared(max_events: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(max_events)))
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<IdleEvent> {
        self.events.iter().cloned().collect()
    }

    /// Stored event payloads, oldest first.
    #[must_use]
    pub fn kinds(&self) -> Vec<IdleEventKind> {
        self.events.iter().map(|e| e.kind.clone()).collect()
    }

    /// Drop every stored event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl IdleObserver for InMemoryObserver {
    fn notify(&mut self, event: &IdleEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
    }
}

/// Mirrors events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IdleObserver for TracingObserver {
    fn notify(&mut self, event: &IdleEvent) {
        match &event.kind {
            IdleEventKind::LaunchFailed { item, reason } => {
                tracing::warn!(event_id = %event.event_id, item = %item, reason = %reason, "launch failed");
            }
            IdleEventKind::WorkerExited { item } => {
                tracing::warn!(event_id = %event.event_id, item = %item, "worker exited unexpectedly");
            }
            kind => {
                tracing::info!(event_id = %event.event_id, event = ?kind, "idle event");
            }
        }
    }
}

/// Stamp an event with a fresh id and the current time.
#[must_use]
pub fn build_event(kind: IdleEventKind) -> IdleEvent {
    IdleEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        created_at_ms: now_ms(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_observer_is_bounded() {
        let mut observer = InMemoryObserver::new(2);
        for max in 1..=3 {
            observer.notify(&build_event(IdleEventKind::CapacityChanged {
                max_concurrent: max,
            }));
        }

        assert_eq!(
            observer.kinds(),
            vec![
                IdleEventKind::CapacityChanged { max_concurrent: 2 },
                IdleEventKind::CapacityChanged { max_concurrent: 3 },
            ]
        );
    }

    #[test]
    fn shared_observer_sees_events() {
        let shared = InMemoryObserver::shared(8);
        let mut handle = Arc::clone(&shared);
        handle.notify(&build_event(IdleEventKind::ActivityChanged { active: true }));

        assert_eq!(shared.lock().events().len(), 1);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = build_event(IdleEventKind::WorkerStarted {
            item: ItemId::from("440"),
        });
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["kind"], "worker_started");
        assert_eq!(value["item"], "440");
        assert_eq!(value["event_id"].as_str().unwrap().len(), 36);
    }
}
