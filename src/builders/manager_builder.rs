//! Builders to construct an idle manager from configuration.

use std::sync::Arc;

use crate::config::IdleConfig;
use crate::core::{
    AvailabilityProbe, Catalog, IdleManager, IdleObserver, ProcessLauncher, Scheduler,
    SchedulerError, StateStore,
};
use crate::infra::{AlwaysAvailable, CommandLauncher, InMemoryStateStore, JsonFileStateStore};

/// Wires configuration, catalog and backends into an [`IdleManager`].
///
/// Backends not set explicitly are derived from the configuration: a
/// [`CommandLauncher`] from `launcher`, and a [`JsonFileStateStore`] when
/// `state_path` is set (in-memory otherwise).
pub struct ManagerBuilder {
    config: IdleConfig,
    catalog: Catalog,
    launcher: Option<Arc<dyn ProcessLauncher>>,
    store: Option<Box<dyn StateStore>>,
    observers: Vec<Box<dyn IdleObserver>>,
    available: bool,
}

impl ManagerBuilder {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: IdleConfig) -> Self {
        let available = config.availability.ignore_client;
        Self {
            config,
            catalog: Catalog::new(),
            launcher: None,
            store: None,
            observers: Vec::new(),
            available,
        }
    }

    /// Items the manager starts with.
    #[must_use]
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the configured launcher.
    #[must_use]
    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Replace the configured store.
    #[must_use]
    pub fn store(mut self, store: Box<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an observer.
    #[must_use]
    pub fn observer(mut self, observer: impl IdleObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Initial availability signal. Defaults to `ignore_client`.
    #[must_use]
    pub const fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Validate configuration and build the manager. Saved state is not
    /// applied; call [`IdleManager::restore`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] for invalid configuration and
    /// [`SchedulerError::Persistence`] if the state file location is unusable.
    pub fn build(self) -> Result<IdleManager, SchedulerError> {
        self.config.validate().map_err(SchedulerError::Config)?;

        let launcher = match self.launcher {
            Some(launcher) => launcher,
            None => Arc::new(CommandLauncher::new(
                self.config.launcher.program.clone(),
                self.config.launcher.args.clone(),
            )),
        };
        let store: Box<dyn StateStore> = match (self.store, &self.config.state_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Box::new(JsonFileStateStore::new(path)?),
            (None, None) => Box::new(InMemoryStateStore::new()),
        };

        let scheduler = Scheduler::new(self.config.effective_max_concurrent(), launcher)?
            .with_active(self.config.start_active)
            .with_available(self.available);

        tracing::info!(
            mode = ?self.config.mode,
            max_concurrent = scheduler.max_concurrent(),
            active = scheduler.is_enabled(),
            items = self.catalog.len(),
            "idle manager built"
        );

        let mut manager = IdleManager::new(scheduler, self.catalog).with_store(store);
        for observer in self.observers {
            manager.add_boxed_observer(observer);
        }
        Ok(manager)
    }
}

/// Availability probe selected by the configuration.
///
/// `ignore_client` wins over a probe command; with neither set the client is
/// treated as always available.
#[must_use]
pub fn build_probe(config: &IdleConfig) -> Arc<dyn AvailabilityProbe> {
    if config.availability.ignore_client {
        return Arc::new(AlwaysAvailable);
    }
    command_probe(config).unwrap_or_else(|| Arc::new(AlwaysAvailable))
}

#[cfg(feature = "tokio-runtime")]
fn command_probe(config: &IdleConfig) -> Option<Arc<dyn AvailabilityProbe>> {
    let program = config.availability.probe_program.as_ref()?;
    Some(Arc::new(crate::infra::CommandProbe::new(
        program.clone(),
        config.availability.probe_args.clone(),
    )))
}

#[cfg(not(feature = "tokio-runtime"))]
fn command_probe(config: &IdleConfig) -> Option<Arc<dyn AvailabilityProbe>> {
    if config.availability.probe_program.is_some() {
        tracing::warn!("probe command needs the tokio-runtime feature; treating client as available");
    }
    None
}
