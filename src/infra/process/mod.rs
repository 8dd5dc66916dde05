//! Worker process backends.

pub mod command;
pub mod memory;

pub use command::CommandLauncher;
pub use memory::InMemoryLauncher;
