//! Configuration models for the idle scheduler, its launcher and the
//! availability check.

pub mod idle;

pub use idle::{AvailabilityConfig, IdleConfig, IdleMode, LauncherConfig};
