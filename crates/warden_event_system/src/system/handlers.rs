/// Event handler registration methods
use super::core::{EventSystem, Registration};
use crate::events::{EventError, EventHandler, EventPriority, ProxyEvent};
use async_trait::async_trait;
use compact_str::CompactString;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// Adapter turning a synchronous closure into an [`EventHandler`].
///
/// Handy for small listeners and tests:
///
/// ```rust
/// use warden_event_system::{ChatEvent, FnHandler};
///
/// let shout = FnHandler::new(|event: &mut ChatEvent| {
///     event.message = event.message.to_uppercase();
///     Ok(())
/// });
/// ```
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F> {
    /// The bound pins the closure's error type, so `Ok(())` needs no
    /// annotation.
    pub fn new<E>(handler: F) -> Self
    where
        F: Fn(&mut E) -> Result<(), EventError>,
    {
        Self { handler }
    }
}

#[async_trait]
impl<E, F> EventHandler<E> for FnHandler<F>
where
    E: ProxyEvent,
    F: Fn(&mut E) -> Result<(), EventError> + Send + Sync + 'static,
{
    async fn handle(&self, event: &mut E) -> Result<(), EventError> {
        (self.handler)(event)
    }
}

impl EventSystem {
    /// Registers a handler for event type `E`.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable handler name used in logs
    /// * `priority` - Dispatch slot; ties keep registration order
    /// * `handler` - The handler implementation
    pub async fn on<E, H>(
        &self,
        name: &str,
        priority: EventPriority,
        handler: H,
    ) -> Result<(), EventError>
    where
        E: ProxyEvent,
        H: EventHandler<E>,
    {
        self.register(name, priority, Arc::new(handler) as Arc<dyn EventHandler<E>>)
            .await
    }

    /// Registers an already shared handler for event type `E`.
    ///
    /// Lets one listener object serve several events while keeping a single
    /// instance (and its state) alive.
    pub async fn register<E>(
        &self,
        name: &str,
        priority: EventPriority,
        handler: Arc<dyn EventHandler<E>>,
    ) -> Result<(), EventError>
    where
        E: ProxyEvent,
    {
        if self.shutdown.is_draining() {
            return Err(EventError::ShuttingDown);
        }

        let event_key = Self::event_key(E::NAME);
        let registration = Registration {
            name: CompactString::from(name),
            priority,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            handler: Box::new(handler),
        };

        {
            let mut entry = self.handlers.entry(event_key.clone()).or_default();
            entry.push(registration);
            entry.sort_by_key(|r| (r.priority, r.sequence));
        }

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("📝 Registered handler '{}' for {} ({:?})", name, event_key, priority);
        Ok(())
    }

    /// Number of handlers registered for event type `E`.
    pub fn handler_count<E: ProxyEvent>(&self) -> usize {
        self.handlers
            .get(&Self::event_key(E::NAME))
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}
