//! # Plugin Interface
//!
//! Warden features are packaged as plugins that register handlers with an
//! [`EventSystem`] and run background work against a [`ProxyHost`].
//!
//! ## Plugin Lifecycle
//!
//! 1. **Creation** - plugin instance built with its services
//! 2. **Handler Registration** - `register_handlers()` wires listeners
//! 3. **Initialization** - `on_init()` starts background tasks
//! 4. **Operation** - events are dispatched to the plugin
//! 5. **Shutdown** - `on_shutdown()` flushes state and stops tasks

use crate::events::EventError;
use crate::proxy::ProxyHost;
use crate::system::EventSystem;
use async_trait::async_trait;
use std::sync::Arc;

/// Plugin trait implemented by every Warden feature bundle.
#[async_trait]
pub trait SimplePlugin: Send + Sync + 'static {
    /// Unique, stable plugin name used in logs.
    fn name(&self) -> &str;

    /// Semantic version of the plugin.
    fn version(&self) -> &str;

    /// Registers event handlers. Called once, before `on_init()`.
    async fn register_handlers(&self, events: Arc<EventSystem>) -> Result<(), PluginError>;

    /// Starts background work. The default does nothing.
    async fn on_init(&self, _host: Arc<dyn ProxyHost>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Stops background work and flushes state. The default does nothing.
    async fn on_shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Errors reported by plugins during their lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Plugin initialization failed
    #[error("Plugin initialization failed: {0}")]
    InitializationFailed(String),

    /// Plugin execution error
    #[error("Plugin execution error: {0}")]
    ExecutionError(String),

    /// Handler registration failed
    #[error("Handler registration failed: {0}")]
    Registration(#[from] EventError),

    /// Plugin shutdown did not complete cleanly
    #[error("Plugin shutdown failed: {0}")]
    ShutdownFailed(String),
}
