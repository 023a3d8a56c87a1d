/// Core EventSystem implementation
use super::stats::EventSystemStats;
use crate::events::EventPriority;
use crate::shutdown::ShutdownState;
use compact_str::CompactString;
use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::AtomicU64;
use tokio::sync::RwLock;

/// A registered handler with its dispatch metadata.
///
/// The handler itself is stored type-erased; it is an
/// `Arc<dyn EventHandler<E>>` for the event type the registration key
/// belongs to.
pub(super) struct Registration {
    pub(super) name: CompactString,
    pub(super) priority: EventPriority,
    pub(super) sequence: u64,
    pub(super) handler: Box<dyn Any + Send + Sync>,
}

/// The central hub for proxy event dispatch.
///
/// Handlers are grouped by event key (`proxy:<event name>`) in a DashMap so
/// registration and emission never contend on a global lock. Within a key,
/// handlers are kept sorted by priority and registration order.
pub struct EventSystem {
    /// Lock-free map of event keys to their registered handlers
    pub(super) handlers: DashMap<CompactString, Vec<Registration>>,
    /// Monotonic registration counter used to keep insertion order stable
    pub(super) sequence: AtomicU64,
    /// System statistics for monitoring
    pub(super) stats: RwLock<EventSystemStats>,
    /// Shared shutdown phase; from `Draining` on nothing is dispatched
    pub(super) shutdown: ShutdownState,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("event_keys", &self.handlers.len())
            .field("shutdown", &self.shutdown.is_draining())
            .finish()
    }
}

impl EventSystem {
    /// Creates a new event system with no registered handlers.
    pub fn new() -> Self {
        Self::with_shutdown(ShutdownState::new())
    }

    /// Creates an event system bound to an existing shutdown state.
    pub fn with_shutdown(shutdown: ShutdownState) -> Self {
        Self {
            handlers: DashMap::new(),
            sequence: AtomicU64::new(0),
            stats: RwLock::new(EventSystemStats::default()),
            shutdown,
        }
    }

    /// Gets the current event system statistics
    #[inline]
    pub async fn get_stats(&self) -> EventSystemStats {
        self.stats.read().await.clone()
    }

    /// The shutdown state this event system observes.
    pub fn shutdown_state(&self) -> &ShutdownState {
        &self.shutdown
    }

    pub(super) fn event_key(event_name: &str) -> CompactString {
        CompactString::new_inline("proxy:") + event_name
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
