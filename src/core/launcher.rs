//! Process launching traits.
//!
//! A [`ProcessLauncher`] turns an item id into a live OS-level background
//! process. The scheduler never touches `std::process` directly; it goes
//! through this seam so the same state machine drives real processes
//! ([`CommandLauncher`](crate::infra::process::CommandLauncher)) and the
//! in-memory double used by tests and benchmarks
//! ([`InMemoryLauncher`](crate::infra::process::InMemoryLauncher)).
//!
//! # Example
//!
//! ```rust,ignore
//! use drop_idler::core::{IdleProcess, ItemId, ProcessLauncher, SchedulerError};
//!
//! struct EchoLauncher;
//!
//! impl ProcessLauncher for EchoLauncher {
//!     fn launch(&self, item: &ItemId) -> Result<Box<dyn IdleProcess>, SchedulerError> {
//!         let child = std::process::Command::new("sleep")
//!             .arg("3600")
//!             .spawn()
//!             .map_err(|e| SchedulerError::Launch(format!("{item}: {e}")))?;
//!         Ok(Box::new(child))
//!     }
//! }
//! ```

use std::fmt;

use crate::core::{ItemId, SchedulerError};

/// A launched background process owned by exactly one worker.
pub trait IdleProcess: Send + fmt::Debug {
    /// OS process id, if the backend has one.
    fn pid(&self) -> Option<u32>;

    /// Check without blocking whether the process has exited on its own.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Process`] if the process state cannot be read.
    fn has_exited(&mut self) -> Result<bool, SchedulerError>;

    /// Terminate the process immediately.
    ///
    /// Terminating an already exited process succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Process`] if the kill signal cannot be delivered.
    fn terminate(&mut self) -> Result<(), SchedulerError>;
}

/// Abstraction for starting the per-item background process.
pub trait ProcessLauncher: Send + Sync {
    /// Launch the idle process for `item`.
    ///
    /// Returns once the process exists; it does not wait for the process to do
    /// any work.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Launch`] when the process cannot be spawned.
    fn launch(&self, item: &ItemId) -> Result<Box<dyn IdleProcess>, SchedulerError>;
}

impl IdleProcess for std::process::Child {
    fn pid(&self) -> Option<u32> {
        Some(self.id())
    }

    fn has_exited(&mut self) -> Result<bool, SchedulerError> {
        self.try_wait()
            .map(|status| status.is_some())
            .map_err(|e| SchedulerError::Process(e.to_string()))
    }

    fn terminate(&mut self) -> Result<(), SchedulerError> {
        if self.has_exited()? {
            return Ok(());
        }
        self.kill()
            .map_err(|e| SchedulerError::Process(e.to_string()))?;
        // Reap so the child does not linger as a zombie. The kill cannot be
        // caught or ignored, so this returns once the OS has torn it down.
        self.wait()
            .map(|_| ())
            .map_err(|e| SchedulerError::Process(e.to_string()))
    }
}
