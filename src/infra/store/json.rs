//! JSON file state store.
//!
//! The whole state is rewritten on every save: written to a sibling temp file
//! first, then renamed over the target.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::core::{PersistedState, SchedulerError, StateStore};

/// Persists [`PersistedState`] as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    /// Create a store at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] if the parent directory cannot
    /// be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        }
        Ok(Self { path })
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&mut self) -> Result<Option<PersistedState>, SchedulerError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SchedulerError::Persistence(e.to_string())),
        };
        let state: PersistedState = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| SchedulerError::Persistence(format!("{}: {e}", self.path.display())))?;
        Ok(Some(state))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), SchedulerError> {
        let temp = self.temp_path();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp)
            .map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)
            .map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        drop(writer);
        std::fs::rename(&temp, &self.path).map_err(|e| SchedulerError::Persistence(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), queue = state.queue.len(), "idle state saved");
        Ok(())
    }
}
