//! Per-item worker process lifecycle.
//!
//! A [`WorkerProcess`] owns at most one launched [`IdleProcess`]. It is created
//! empty with its item, started and stopped any number of times, and kills its
//! process when dropped, so tearing down an item (or the whole manager) never
//! leaks a background process.

use serde::{Deserialize, Serialize};

use crate::core::{IdleProcess, ItemId, ProcessLauncher};

/// Result of asking a worker (or the manager) to start idling an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartOutcome {
    /// A new process was launched.
    Started,
    /// The worker was already running; nothing changed.
    AlreadyRunning,
    /// The item is blacklisted or has no remaining units.
    Ineligible,
    /// The availability precondition is false or the scheduler is paused.
    Unavailable,
    /// Every slot under the concurrency cap is taken.
    NoFreeSlot,
    /// The launcher failed; the slot stays free.
    Failed(String),
}

impl StartOutcome {
    /// Whether a process was actually launched.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}

/// Details of a process that exited without being stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// Item whose process exited.
    pub item: ItemId,
    /// OS process id, if known.
    pub pid: Option<u32>,
}

/// Background process slot for a single item.
#[derive(Debug, Default)]
pub struct WorkerProcess {
    process: Option<Box<dyn IdleProcess>>,
    launches: u64,
}

impl WorkerProcess {
    /// Create a worker with no process attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a process is currently attached.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Process id of the running process.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid())
    }

    /// Number of successful launches over the worker's lifetime.
    #[must_use]
    pub const fn launches(&self) -> u64 {
        self.launches
    }

    /// Launch the idle process for `item`.
    ///
    /// Starting is only valid while `remaining_units > 0`. Starting a running
    /// worker is a no-op.
    pub fn start(
        &mut self,
        item: &ItemId,
        remaining_units: u32,
        launcher: &dyn ProcessLauncher,
    ) -> StartOutcome {
        if self.is_running() {
            return StartOutcome::AlreadyRunning;
        }
        if remaining_units == 0 {
            tracing::debug!(item = %item, "refusing to start depleted item");
            return StartOutcome::Ineligible;
        }

        match launcher.launch(item) {
            Ok(process) => {
                tracing::info!(item = %item, pid = ?process.pid(), "idle process started");
                self.process = Some(process);
                self.launches += 1;
                StartOutcome::Started
            }
            Err(e) => {
                tracing::warn!(item = %item, error = %e, "idle process failed to launch");
                StartOutcome::Failed(e.to_string())
            }
        }
    }

    /// Terminate the process if one is attached.
    ///
    /// Returns `true` if a process was running. Idempotent.
    pub fn stop(&mut self) -> bool {
        let Some(mut process) = self.process.take() else {
            return false;
        };
        let pid = process.pid();
        if let Err(e) = process.terminate() {
            // The handle is released either way; a kill failure means the
            // process is already gone or out of our reach.
            tracing::warn!(pid = ?pid, error = %e, "failed to terminate idle process");
        } else {
            tracing::debug!(pid = ?pid, "idle process terminated");
        }
        true
    }

    /// Detach the process if it exited on its own.
    pub fn poll_exit(&mut self, item: &ItemId) -> Option<ExitReport> {
        let process = self.process.as_mut()?;
        let exited = match process.has_exited() {
            Ok(exited) => exited,
            Err(e) => {
                tracing::warn!(item = %item, error = %e, "cannot read idle process state");
                false
            }
        };
        if !exited {
            return None;
        }
        let pid = process.pid();
        self.process = None;
        Some(ExitReport {
            item: item.clone(),
            pid,
        })
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        self.stop();
    }
}
