//! Runtime adapters and API surface.

use std::future::Future;

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod service;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use api::{health, Health, IdleSnapshot, ItemSnapshot};
#[cfg(feature = "tokio-runtime")]
pub use service::{IdleCommand, IdleHandle, IdleService};
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;

/// Runs a background future on some executor.
pub trait Spawn {
    /// Spawn `fut` detached.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
