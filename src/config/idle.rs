//! Idle scheduler configuration structures.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// How many items idle at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleMode {
    /// One item at a time, in queue order.
    OneByOne,
    /// Up to `max_concurrent` items at once.
    #[default]
    Parallel,
}

/// Worker process command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Program started once per item.
    pub program: PathBuf,
    /// Arguments; `{id}` is replaced by the item id.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("steam-idle"),
            args: vec!["{id}".to_owned()],
        }
    }
}

/// External client availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    /// Treat the client as always available.
    #[serde(default)]
    pub ignore_client: bool,
    /// Probe command; success means available.
    #[serde(default)]
    pub probe_program: Option<PathBuf>,
    /// Probe arguments.
    #[serde(default)]
    pub probe_args: Vec<String>,
    /// Seconds between probes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_reap_interval_secs() -> u64 {
    2
}

const fn default_max_concurrent() -> usize {
    1
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            ignore_client: false,
            probe_program: None,
            probe_args: Vec::new(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Root configuration for one idle manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleConfig {
    /// Concurrency mode.
    #[serde(default)]
    pub mode: IdleMode,
    /// Cap used in [`IdleMode::Parallel`].
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Whether idling is switched on at startup.
    #[serde(default)]
    pub start_active: bool,
    /// Worker process command.
    #[serde(default)]
    pub launcher: LauncherConfig,
    /// Availability check.
    #[serde(default)]
    pub availability: AvailabilityConfig,
    /// Seconds between checks for processes that exited on their own.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
    /// Where queue, blacklist and cap are saved. In memory when unset.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            mode: IdleMode::default(),
            max_concurrent: default_max_concurrent(),
            start_active: false,
            launcher: LauncherConfig::default(),
            availability: AvailabilityConfig::default(),
            reap_interval_secs: default_reap_interval_secs(),
            state_path: None,
        }
    }
}

impl IdleConfig {
    /// Cap the scheduler starts with.
    #[must_use]
    pub const fn effective_max_concurrent(&self) -> usize {
        match self.mode {
            IdleMode::OneByOne => 1,
            IdleMode::Parallel => self.max_concurrent,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.reap_interval_secs == 0 {
            return Err("reap_interval_secs must be greater than 0".into());
        }
        if self.availability.poll_interval_secs == 0 {
            return Err("availability.poll_interval_secs must be greater than 0".into());
        }
        if self.launcher.program.as_os_str().is_empty() {
            return Err("launcher.program must not be empty".into());
        }
        if self
            .availability
            .probe_program
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err("availability.probe_program must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading config {}", path.display()))
    }

    /// Build configuration from `DROP_IDLER_*` environment variables,
    /// reading a `.env` file first if present. Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be parsed or the result is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();

        if let Some(mode) = lookup("DROP_IDLER_MODE") {
            cfg.mode = match mode.trim() {
                "one_by_one" => IdleMode::OneByOne,
                "parallel" => IdleMode::Parallel,
                other => anyhow::bail!("DROP_IDLER_MODE: unknown mode `{other}`"),
            };
        }
        if let Some(max) = lookup("DROP_IDLER_MAX_CONCURRENT") {
            cfg.max_concurrent = max
                .trim()
                .parse()
                .context("DROP_IDLER_MAX_CONCURRENT")?;
        }
        if let Some(active) = lookup("DROP_IDLER_START_ACTIVE") {
            cfg.start_active = parse_bool(&active).context("DROP_IDLER_START_ACTIVE")?;
        }
        if let Some(program) = lookup("DROP_IDLER_LAUNCHER") {
            cfg.launcher.program = PathBuf::from(program);
        }
        if let Some(args) = lookup("DROP_IDLER_LAUNCHER_ARGS") {
            cfg.launcher.args = args.split_whitespace().map(str::to_owned).collect();
        }
        if let Some(ignore) = lookup("DROP_IDLER_IGNORE_CLIENT") {
            cfg.availability.ignore_client =
                parse_bool(&ignore).context("DROP_IDLER_IGNORE_CLIENT")?;
        }
        if let Some(probe) = lookup("DROP_IDLER_PROBE") {
            let mut parts = probe.split_whitespace().map(str::to_owned);
            cfg.availability.probe_program = parts.next().map(PathBuf::from);
            cfg.availability.probe_args = parts.collect();
        }
        if let Some(secs) = lookup("DROP_IDLER_POLL_SECS") {
            cfg.availability.poll_interval_secs =
                secs.trim().parse().context("DROP_IDLER_POLL_SECS")?;
        }
        if let Some(path) = lookup("DROP_IDLER_STATE_PATH") {
            cfg.state_path = Some(PathBuf::from(path));
        }

        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn parse_bool(raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{other}`"),
    }
}
