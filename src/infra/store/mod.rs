//! State store backends.

pub mod json;
pub mod memory;

pub use json::JsonFileStateStore;
pub use memory::InMemoryStateStore;
