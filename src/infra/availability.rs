//! Availability probe backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AvailabilityProbe;

/// Probe that always reports available. Used when the client check is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAvailable;

#[async_trait]
impl AvailabilityProbe for AlwaysAvailable {
    async fn is_available(&self) -> bool {
        true
    }
}

/// Probe backed by a shared flag that the caller flips.
#[derive(Debug, Default, Clone)]
pub struct ManualAvailability {
    flag: Arc<AtomicBool>,
}

impl ManualAvailability {
    /// Create a probe with an initial value.
    #[must_use]
    pub fn new(available: bool) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(available)),
        }
    }

    /// Change the reported value.
    pub fn set(&self, available: bool) {
        self.flag.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl AvailabilityProbe for ManualAvailability {
    async fn is_available(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Probe that runs a command; a zero exit status means available.
///
/// Spawn failures and non-zero exits both read as unavailable.
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: std::path::PathBuf,
    args: Vec<String>,
}

#[cfg(feature = "tokio-runtime")]
impl CommandProbe {
    /// Create a probe running `program` with `args`.
    pub fn new(
        program: impl Into<std::path::PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(feature = "tokio-runtime")]
#[async_trait]
impl AvailabilityProbe for CommandProbe {
    async fn is_available(&self) -> bool {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(program = %self.program.display(), error = %e, "availability probe failed");
                false
            }
        }
    }
}
