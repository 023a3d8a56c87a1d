//! Shutdown coordination.
//!
//! A node leaves in a fixed order: stop dispatching events, say goodbye to
//! the other proxies, close storage. [`ShutdownState`] holds the current
//! [`ShutdownPhase`] in a `watch` channel so background tasks can wait for
//! the phase that concerns them instead of being aborted.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Phases in the order a node passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    Running,
    /// No new events are dispatched or registered.
    Draining,
    /// Plugins are stopped; the node is announcing its departure.
    LeavingNetwork,
    /// Connection pools are being closed.
    Closing,
    Complete,
}

/// Shared, cloneable handle on the node's shutdown phase.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    phase: Arc<watch::Sender<ShutdownPhase>>,
}

impl ShutdownState {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(ShutdownPhase::Running);
        Self { phase: Arc::new(phase) }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    /// True from [`ShutdownPhase::Draining`] on.
    pub fn is_draining(&self) -> bool {
        self.phase() >= ShutdownPhase::Draining
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == ShutdownPhase::Complete
    }

    /// Moves to `next` if it comes after the current phase. Phases never go
    /// back; returns whether the phase changed.
    pub fn advance(&self, next: ShutdownPhase) -> bool {
        let moved = self.phase.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if moved {
            debug!("Shutdown phase -> {:?}", next);
        }
        moved
    }

    /// Resolves once the node has reached `phase` (immediately if it
    /// already has).
    pub async fn wait_for(&self, phase: ShutdownPhase) {
        let mut receiver = self.phase.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|current| *current >= phase).await;
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_phases_only_move_forward() {
        let state = ShutdownState::new();
        let clone = state.clone();
        assert!(!clone.is_draining());

        assert!(state.advance(ShutdownPhase::LeavingNetwork));
        assert!(clone.is_draining());
        assert!(!clone.advance(ShutdownPhase::Draining));
        assert_eq!(clone.phase(), ShutdownPhase::LeavingNetwork);

        assert!(clone.advance(ShutdownPhase::Complete));
        assert!(state.is_complete());
    }

    #[tokio::test]
    async fn test_waiters_wake_on_their_phase() {
        let state = ShutdownState::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_for(ShutdownPhase::Closing).await })
        };

        state.advance(ShutdownPhase::Draining);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        state.advance(ShutdownPhase::Closing);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();

        // Already reached: returns at once.
        state.wait_for(ShutdownPhase::Draining).await;
    }
}
