//! External availability signal.

use async_trait::async_trait;

/// Source of the availability precondition.
///
/// No worker may run while the probe reports `false`. The idle service polls
/// the probe on an interval and feeds transitions to the manager.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// Whether the external client prerequisite is satisfied right now.
    async fn is_available(&self) -> bool;
}
