/// Event emission methods
use super::core::EventSystem;
use crate::events::{EventError, EventHandler, ProxyEvent};
use compact_str::CompactString;
use std::sync::Arc;
use tracing::{debug, error, warn};

impl EventSystem {
    /// Dispatches an event to every handler registered for its type.
    ///
    /// Handlers run one after another in priority order so each sees the
    /// changes made by the previous ones. Dispatch stops as soon as the
    /// event reports itself cancelled. A failing handler is logged and
    /// skipped.
    pub async fn emit<E>(&self, event: &mut E) -> Result<(), EventError>
    where
        E: ProxyEvent,
    {
        if self.shutdown.is_draining() {
            return Err(EventError::ShuttingDown);
        }

        let event_key = Self::event_key(E::NAME);
        let handlers = self.snapshot_handlers::<E>(&event_key);

        let mut errors = 0u64;
        for (name, handler) in handlers {
            if event.is_cancelled() {
                debug!("⏭️ {} cancelled before handler '{}'", event_key, name);
                break;
            }
            if let Err(e) = handler.handle(event).await {
                errors += 1;
                error!("❌ Handler '{}' failed for {}: {} (event: {:?})", name, event_key, e, event);
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handler_errors += errors;
        if event.is_cancelled() {
            stats.events_cancelled += 1;
        }

        Ok(())
    }

    /// Clones the handler list out of the map so no shard lock is held
    /// across handler awaits.
    fn snapshot_handlers<E>(&self, event_key: &CompactString) -> Vec<(CompactString, Arc<dyn EventHandler<E>>)>
    where
        E: ProxyEvent,
    {
        let Some(entry) = self.handlers.get(event_key) else {
            return Vec::new();
        };

        entry
            .iter()
            .filter_map(|registration| {
                match registration.handler.downcast_ref::<Arc<dyn EventHandler<E>>>() {
                    Some(handler) => Some((registration.name.clone(), Arc::clone(handler))),
                    None => {
                        warn!(
                            "🟡 Handler '{}' under {} does not match event type {}",
                            registration.name,
                            event_key,
                            std::any::type_name::<E>()
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
