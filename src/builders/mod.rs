//! Builders to construct the idle manager from configuration.

pub mod manager_builder;

pub use manager_builder::{build_probe, ManagerBuilder};
