//! Serialized idle service.
//!
//! [`IdleService`] owns the [`IdleManager`] inside a single task. Commands from
//! any number of [`IdleHandle`]s arrive over one bounded channel and are
//! applied strictly one after another, interleaved with the availability poll
//! and the exited-process reap. Nothing else touches the manager, so each
//! command's scheduling pass sees a consistent state.
//!
//! A probe that does not answer within one poll interval reads as unavailable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::builders::build_probe;
use crate::config::IdleConfig;
use crate::core::{
    AvailabilityProbe, DropOutcome, IdleManager, ItemId, QueuePosition, SchedulerError,
    StartOutcome,
};
use crate::runtime::{IdleSnapshot, Spawn};

const COMMAND_CAPACITY: usize = 64;

/// A request to the idle service, with its reply channel.
#[derive(Debug)]
pub enum IdleCommand {
    /// Insert ids at one end of the queue.
    Enqueue {
        /// Ids to insert, in order.
        ids: Vec<ItemId>,
        /// Queue end.
        position: QueuePosition,
        /// Number inserted.
        reply: oneshot::Sender<usize>,
    },
    /// Remove ids from the queue.
    Dequeue {
        /// Ids to remove.
        ids: Vec<ItemId>,
        /// Number removed.
        reply: oneshot::Sender<usize>,
    },
    /// Move an id one step toward the head.
    Promote {
        /// Item.
        id: ItemId,
        /// Whether it moved.
        reply: oneshot::Sender<bool>,
    },
    /// Move an id one step toward the tail.
    Demote {
        /// Item.
        id: ItemId,
        /// Whether it moved.
        reply: oneshot::Sender<bool>,
    },
    /// Switch idling on or off.
    SetActive {
        /// New value.
        active: bool,
        /// Done.
        reply: oneshot::Sender<()>,
    },
    /// Change the concurrency cap.
    SetMaxConcurrent {
        /// New cap.
        max_concurrent: usize,
        /// Rejected for zero.
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    /// Push an availability value, bypassing the probe.
    SetAvailability {
        /// New value.
        available: bool,
        /// Done.
        reply: oneshot::Sender<()>,
    },
    /// Start one item outside queue order.
    StartItem {
        /// Item.
        id: ItemId,
        /// Outcome.
        reply: oneshot::Sender<StartOutcome>,
    },
    /// Stop one item and return it to idle.
    StopItem {
        /// Item.
        id: ItemId,
        /// Whether anything changed.
        reply: oneshot::Sender<bool>,
    },
    /// Toggle blacklist membership.
    SetBlacklisted {
        /// Item.
        id: ItemId,
        /// New value.
        blacklisted: bool,
        /// Whether it changed.
        reply: oneshot::Sender<Result<bool, SchedulerError>>,
    },
    /// Add or refresh a catalog item.
    UpsertItem {
        /// Item.
        id: ItemId,
        /// Display title.
        title: String,
        /// Units left.
        remaining_units: u32,
        /// Whether the item is new.
        reply: oneshot::Sender<bool>,
    },
    /// Forget a catalog item.
    RemoveItem {
        /// Item.
        id: ItemId,
        /// Whether it existed.
        reply: oneshot::Sender<bool>,
    },
    /// Record consumed units.
    RecordDrops {
        /// Item.
        id: ItemId,
        /// Units consumed.
        count: u32,
        /// Resulting counter state.
        reply: oneshot::Sender<Result<DropOutcome, SchedulerError>>,
    },
    /// Read the current state.
    Snapshot {
        /// Snapshot.
        reply: oneshot::Sender<IdleSnapshot>,
    },
    /// Stop every worker and end the service.
    Shutdown {
        /// Sent once every worker is stopped.
        reply: oneshot::Sender<()>,
    },
}

/// Single-task owner of an [`IdleManager`].
pub struct IdleService {
    manager: IdleManager,
    probe: Arc<dyn AvailabilityProbe>,
    poll_interval: Duration,
    reap_interval: Duration,
}

impl IdleService {
    /// Wrap `manager`, polling `probe` every five seconds and reaping every two.
    #[must_use]
    pub fn new(manager: IdleManager, probe: Arc<dyn AvailabilityProbe>) -> Self {
        Self {
            manager,
            probe,
            poll_interval: Duration::from_secs(5),
            reap_interval: Duration::from_secs(2),
        }
    }

    /// Wrap `manager` with the probe and intervals from `config`.
    #[must_use]
    pub fn from_config(manager: IdleManager, config: &IdleConfig) -> Self {
        Self::new(manager, build_probe(config)).with_intervals(
            Duration::from_secs(config.availability.poll_interval_secs),
            Duration::from_secs(config.reap_interval_secs),
        )
    }

    /// Override the poll and reap intervals.
    #[must_use]
    pub const fn with_intervals(mut self, poll_interval: Duration, reap_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.reap_interval = reap_interval;
        self
    }

    /// Start the service on `spawner` and return a handle to it.
    pub fn spawn<S: Spawn>(self, spawner: &S) -> IdleHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        spawner.spawn(self.run(rx));
        IdleHandle { tx }
    }

    async fn run(self, mut rx: mpsc::Receiver<IdleCommand>) {
        let Self {
            mut manager,
            probe,
            poll_interval,
            reap_interval,
        } = self;

        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reap = tokio::time::interval(reap_interval);
        reap.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_secs = poll_interval.as_secs(),
            reap_secs = reap_interval.as_secs(),
            "idle service started"
        );

        loop {
            tokio::select! {
                command = rx.recv() => {
                    let Some(command) = command else {
                        tracing::info!("all idle handles dropped");
                        manager.shutdown();
                        break;
                    };
                    if !apply(&mut manager, command) {
                        break;
                    }
                }
                _ = poll.tick() => {
                    let available = tokio::time::timeout(poll_interval, probe.is_available())
                        .await
                        .unwrap_or_else(|_| {
                            tracing::warn!(
                                timeout_ms = poll_interval.as_millis(),
                                "availability probe timed out, treating client as unavailable"
                            );
                            false
                        });
                    if available != manager.is_available() {
                        manager.on_availability_changed(available);
                    }
                }
                _ = reap.tick() => {
                    manager.reap_exited();
                }
            }
        }

        tracing::info!("idle service stopped");
    }
}

/// Apply one command. Returns `false` once the service should stop.
fn apply(manager: &mut IdleManager, command: IdleCommand) -> bool {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        IdleCommand::Enqueue {
            ids,
            position,
            reply,
        } => {
            let _ = reply.send(manager.enqueue_all(&ids, position));
        }
        IdleCommand::Dequeue { ids, reply } => {
            let _ = reply.send(manager.dequeue_all(&ids));
        }
        IdleCommand::Promote { id, reply } => {
            let _ = reply.send(manager.promote(&id));
        }
        IdleCommand::Demote { id, reply } => {
            let _ = reply.send(manager.demote(&id));
        }
        IdleCommand::SetActive { active, reply } => {
            manager.set_active(active);
            let _ = reply.send(());
        }
        IdleCommand::SetMaxConcurrent {
            max_concurrent,
            reply,
        } => {
            let _ = reply.send(manager.set_max_concurrent(max_concurrent));
        }
        IdleCommand::SetAvailability { available, reply } => {
            manager.on_availability_changed(available);
            let _ = reply.send(());
        }
        IdleCommand::StartItem { id, reply } => {
            let _ = reply.send(manager.start_item(&id));
        }
        IdleCommand::StopItem { id, reply } => {
            let _ = reply.send(manager.stop_item(&id));
        }
        IdleCommand::SetBlacklisted {
            id,
            blacklisted,
            reply,
        } => {
            let _ = reply.send(manager.set_blacklisted(&id, blacklisted));
        }
        IdleCommand::UpsertItem {
            id,
            title,
            remaining_units,
            reply,
        } => {
            let _ = reply.send(manager.upsert_item(&id, &title, remaining_units));
        }
        IdleCommand::RemoveItem { id, reply } => {
            let _ = reply.send(manager.remove_item(&id));
        }
        IdleCommand::RecordDrops { id, count, reply } => {
            let _ = reply.send(manager.record_drops(&id, count));
        }
        IdleCommand::Snapshot { reply } => {
            let _ = reply.send(manager.snapshot());
        }
        IdleCommand::Shutdown { reply } => {
            manager.shutdown();
            let _ = reply.send(());
            return false;
        }
    }
    true
}

/// Cloneable client of a running [`IdleService`].
///
/// Every method fails with [`SchedulerError::ServiceClosed`] once the service
/// has stopped.
#[derive(Debug, Clone)]
pub struct IdleHandle {
    tx: mpsc::Sender<IdleCommand>,
}

impl IdleHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> IdleCommand,
    ) -> Result<T, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SchedulerError::ServiceClosed)?;
        rx.await.map_err(|_| SchedulerError::ServiceClosed)
    }

    /// Whether the service has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Insert `id` at the head of the queue.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn enqueue_front(&self, id: ItemId) -> Result<bool, SchedulerError> {
        Ok(self.enqueue_all(vec![id], QueuePosition::Front).await? == 1)
    }

    /// Insert `id` at the tail of the queue.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn enqueue_back(&self, id: ItemId) -> Result<bool, SchedulerError> {
        Ok(self.enqueue_all(vec![id], QueuePosition::Back).await? == 1)
    }

    /// Insert `ids` at `position`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn enqueue_all(
        &self,
        ids: Vec<ItemId>,
        position: QueuePosition,
    ) -> Result<usize, SchedulerError> {
        self.request(|reply| IdleCommand::Enqueue {
            ids,
            position,
            reply,
        })
        .await
    }

    /// Remove `id` from the queue.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn dequeue(&self, id: ItemId) -> Result<bool, SchedulerError> {
        Ok(self.dequeue_all(vec![id]).await? == 1)
    }

    /// Remove `ids` from the queue.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn dequeue_all(&self, ids: Vec<ItemId>) -> Result<usize, SchedulerError> {
        self.request(|reply| IdleCommand::Dequeue { ids, reply }).await
    }

    /// Move `id` one step toward the head.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn promote(&self, id: ItemId) -> Result<bool, SchedulerError> {
        self.request(|reply| IdleCommand::Promote { id, reply }).await
    }

    /// Move `id` one step toward the tail.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn demote(&self, id: ItemId) -> Result<bool, SchedulerError> {
        self.request(|reply| IdleCommand::Demote { id, reply }).await
    }

    /// Switch idling on or off.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn set_active(&self, active: bool) -> Result<(), SchedulerError> {
        self.request(|reply| IdleCommand::SetActive { active, reply })
            .await
    }

    /// Change the concurrency cap.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConcurrency`] for zero,
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn set_max_concurrent(&self, max_concurrent: usize) -> Result<(), SchedulerError> {
        self.request(|reply| IdleCommand::SetMaxConcurrent {
            max_concurrent,
            reply,
        })
        .await?
    }

    /// Push an availability value. The next poll may override it.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn set_availability(&self, available: bool) -> Result<(), SchedulerError> {
        self.request(|reply| IdleCommand::SetAvailability { available, reply })
            .await
    }

    /// Start one item outside queue order.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn start_item(&self, id: ItemId) -> Result<StartOutcome, SchedulerError> {
        self.request(|reply| IdleCommand::StartItem { id, reply }).await
    }

    /// Stop one item and return it to idle.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn stop_item(&self, id: ItemId) -> Result<bool, SchedulerError> {
        self.request(|reply| IdleCommand::StopItem { id, reply }).await
    }

    /// Toggle blacklist membership.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownItem`] for an id not in the catalog,
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn set_blacklisted(
        &self,
        id: ItemId,
        blacklisted: bool,
    ) -> Result<bool, SchedulerError> {
        self.request(|reply| IdleCommand::SetBlacklisted {
            id,
            blacklisted,
            reply,
        })
        .await?
    }

    /// Add or refresh a catalog item.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn upsert_item(
        &self,
        id: ItemId,
        title: impl Into<String>,
        remaining_units: u32,
    ) -> Result<bool, SchedulerError> {
        let title = title.into();
        self.request(|reply| IdleCommand::UpsertItem {
            id,
            title,
            remaining_units,
            reply,
        })
        .await
    }

    /// Forget a catalog item.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn remove_item(&self, id: ItemId) -> Result<bool, SchedulerError> {
        self.request(|reply| IdleCommand::RemoveItem { id, reply }).await
    }

    /// Record consumed units.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownItem`] for an id not in the catalog,
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn record_drops(&self, id: ItemId, count: u32) -> Result<DropOutcome, SchedulerError> {
        self.request(|reply| IdleCommand::RecordDrops { id, count, reply })
            .await?
    }

    /// Current state.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is gone.
    pub async fn snapshot(&self) -> Result<IdleSnapshot, SchedulerError> {
        self.request(|reply| IdleCommand::Snapshot { reply }).await
    }

    /// Stop every worker and end the service.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ServiceClosed`] if the service is already gone.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.request(|reply| IdleCommand::Shutdown { reply }).await
    }
}
