//! Infrastructure adapters for worker processes, state storage and the
//! availability signal.

pub mod availability;
pub mod process;
pub mod store;

pub use availability::{AlwaysAvailable, ManualAvailability};
#[cfg(feature = "tokio-runtime")]
pub use availability::CommandProbe;
pub use process::{CommandLauncher, InMemoryLauncher};
pub use store::{InMemoryStateStore, JsonFileStateStore};
