/// Statistics tracking for the event system
use serde::{Deserialize, Serialize};

/// Event system statistics for health reporting
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventSystemStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Total number of events emitted since system start
    pub events_emitted: u64,
    /// Events that ended up cancelled or denied
    pub events_cancelled: u64,
    /// Handler invocations that returned an error
    pub handler_errors: u64,
}
