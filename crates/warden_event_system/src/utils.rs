//! # Utility Functions
//!
//! Timestamp helpers and the event system factory. Every record Warden
//! stores or relays uses Unix milliseconds from [`current_timestamp_millis`].

use crate::system::EventSystem;
use std::sync::Arc;

/// Returns the current Unix timestamp in milliseconds.
///
/// A clock set before the Unix epoch yields 0 rather than panicking.
pub fn current_timestamp_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Returns the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    (current_timestamp_millis() / 1000) as u64
}

/// Creates a new shareable event system instance.
pub fn create_warden_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_agree() {
        let millis = current_timestamp_millis();
        let secs = current_timestamp();
        assert!(millis > 1_600_000_000_000);
        assert!((secs as i64 - millis / 1000).abs() <= 1);
    }
}
