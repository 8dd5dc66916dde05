//! Core scheduling abstractions: items, the idle queue, worker lifecycle and
//! the concurrency-bounded scheduler.

pub mod availability;
pub mod catalog;
pub mod error;
pub mod events;
pub mod idle_queue;
pub mod item;
pub mod launcher;
pub mod manager;
pub mod persistence;
pub mod scheduler;
pub mod worker;

pub use availability::AvailabilityProbe;
pub use catalog::{Catalog, CatalogTotals};
pub use error::{AppResult, SchedulerError};
pub use events::{
    build_event, IdleEvent, IdleEventKind, IdleObserver, InMemoryObserver, TracingObserver,
};
pub use idle_queue::{Direction, IdleQueue, QueuePosition};
pub use item::{DropOutcome, Item, ItemId, ItemState};
pub use launcher::{IdleProcess, ProcessLauncher};
pub use manager::IdleManager;
pub use persistence::{PersistedState, StateStore};
pub use scheduler::{PassReport, Scheduler};
pub use worker::{ExitReport, StartOutcome, WorkerProcess};
