//! # Drop Idler
//!
//! A concurrency-bounded idle queue and per-item worker process scheduler.
//!
//! Each item accumulates a scarce, decrementing resource (drops) while a
//! background worker process runs for it. This crate decides, at any moment,
//! which items get a running worker: in queue order, never more than
//! `max_concurrent` at once, never a blacklisted or depleted item, and never
//! while the external client reports itself unavailable.
//!
//! ## Core Model
//!
//! - **Item**: an id, a title, a remaining-units counter, a blacklist flag and
//!   one [`WorkerProcess`](core::WorkerProcess).
//! - **Idle queue**: explicit priority order. Position 0 is served first;
//!   only explicit promote/demote commands reorder it.
//! - **Scheduler**: one pass fills free slots in queue order. Running items
//!   are never preempted and a lowered cap only blocks new admissions.
//! - **Availability**: an absolute precondition. While it is false every
//!   worker is stopped and the queue is kept, so workers resume in the same
//!   order once it returns.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use drop_idler::core::{Catalog, IdleManager, Item, ItemId, Scheduler};
//! use drop_idler::infra::CommandLauncher;
//!
//! let mut catalog = Catalog::new();
//! catalog.insert(Item::new("440", "Team Fortress 2", 3));
//! catalog.insert(Item::new("570", "Dota 2", 1));
//!
//! let launcher = Arc::new(CommandLauncher::new("steam-idle", ["{id}"]));
//! let scheduler = Scheduler::new(1, launcher)?.with_active(true);
//! let mut manager = IdleManager::new(scheduler, catalog);
//!
//! manager.enqueue_back(&ItemId::from("440"));
//! manager.enqueue_back(&ItemId::from("570"));
//! manager.on_availability_changed(true); // 440 starts, 570 waits
//! manager.record_drops(&ItemId::from("440"), 3)?; // 440 depleted, 570 starts
//! ```
//!
//! For a long-running process, wrap the manager in
//! [`IdleService`](runtime::IdleService) and talk to it through cloneable
//! [`IdleHandle`](runtime::IdleHandle)s; every command is then applied on one
//! serialized sequence together with availability polling.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: items, queue, workers and the scheduler.
pub mod core;
/// Configuration models for the scheduler, launcher and availability check.
pub mod config;
/// Builders to construct the manager from configuration.
pub mod builders;
/// Infrastructure adapters for processes, state storage and availability.
pub mod infra;
/// Runtime adapters (tokio service) and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
