//! OS process launcher.
//!
//! Spawns the configured program once per item. Any argument containing
//! `{id}` has the item id substituted, so one launcher serves every item:
//!
//! ```text
//! program = "steam-idle"   args = ["--app", "{id}"]
//! ```

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::core::{IdleProcess, ItemId, ProcessLauncher, SchedulerError};

const ID_PLACEHOLDER: &str = "{id}";

/// Launches one child process per item.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLauncher {
    /// Create a launcher for `program` with argument templates `args`.
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments for `item` with the placeholder substituted.
    #[must_use]
    pub fn args_for(&self, item: &ItemId) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(ID_PLACEHOLDER, item.as_str()))
            .collect()
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch(&self, item: &ItemId) -> Result<Box<dyn IdleProcess>, SchedulerError> {
        let child = Command::new(&self.program)
            .args(self.args_for(item))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SchedulerError::Launch(format!("{}: {e}", self.program.display()))
            })?;
        Ok(Box::new(child))
    }
}
