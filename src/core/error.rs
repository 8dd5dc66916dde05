//! Error types for scheduler operations.
//!
//! Ineligible commands (enqueueing a blacklisted item, promoting the head of the
//! queue, starting without a free slot) are not errors; they come back as `false`
//! or a [`StartOutcome`](crate::core::StartOutcome) variant. The variants here
//! cover invalid configuration and backend failures only.

use thiserror::Error;

use crate::core::ItemId;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A concurrency cap below one was requested.
    #[error("max concurrent must be at least 1, got {0}")]
    InvalidConcurrency(usize),
    /// The item is not present in the catalog.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
    /// The worker process could not be launched.
    #[error("launch failed: {0}")]
    Launch(String),
    /// A running worker process could not be inspected or terminated.
    #[error("process error: {0}")]
    Process(String),
    /// The state store failed to load or save.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The idle service task is gone.
    #[error("idle service is not running")]
    ServiceClosed,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
