//! # Warden Moderation Plugin
//!
//! Everything a network operator interacts with: punishments, reports,
//! whitelist, maintenance, chat moderation, network commands and the
//! server list ping.
//!
//! ## Overview
//!
//! - **Services** ([`services`]): the moderation logic on top of
//!   `warden_storage` repositories and the cross-proxy service
//! - **Listeners** ([`handlers`]): react to proxy events (login checks,
//!   chat moderation, routing, pings)
//! - **Commands** ([`commands`]): `/ban`, `/msg`, `/glist` and friends,
//!   dispatched from player command events or the console
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use plugin_moderation::{ModerationConfig, ModerationContext, ModerationPlugin};
//! use std::sync::Arc;
//! use warden_cross_proxy::CrossProxyService;
//! use warden_event_system::{create_warden_event_system, LocalProxy, ProxyHost, SimplePlugin};
//! use warden_storage::{DatabaseManager, DatabaseSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let host: Arc<dyn ProxyHost> = Arc::new(LocalProxy::new("proxy-1", vec!["lobby".into()]));
//! let db = DatabaseManager::connect(&DatabaseSettings::in_memory()).await?;
//! let cross = CrossProxyService::disabled(Arc::clone(&host));
//! let ctx = ModerationContext::new(&ModerationConfig::default(), db, Arc::clone(&host), cross, None)?;
//!
//! let plugin = ModerationPlugin::new(ctx);
//! plugin.register_handlers(create_warden_event_system()).await?;
//! plugin.on_init(host).await?;
//! plugin.dispatch_console("ban Griefer x-ray").await;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod context;
pub mod duration;
pub mod error;
pub mod handlers;
pub mod services;

pub use commands::{Command, CommandRegistry, Invocation};
pub use config::ModerationConfig;
pub use context::{ConfigSource, ModerationContext};
pub use error::{CommandError, ModerationError};

use async_trait::async_trait;
use services::ModerationRelay;
use std::sync::Arc;
use tracing::{info, warn};
use warden_event_system::{CommandSource, EventSystem, PluginError, ProxyHost, SimplePlugin};

pub struct ModerationPlugin {
    ctx: Arc<ModerationContext>,
    registry: Arc<CommandRegistry>,
}

impl ModerationPlugin {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self::with_registry(ctx, CommandRegistry::with_builtin())
    }

    pub fn with_registry(ctx: Arc<ModerationContext>, registry: CommandRegistry) -> Self {
        Self {
            ctx,
            registry: Arc::new(registry),
        }
    }

    pub fn context(&self) -> &Arc<ModerationContext> {
        &self.ctx
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Runs a command typed into the proxy console. Returns `false` for
    /// unknown commands.
    pub async fn dispatch_console(&self, line: &str) -> bool {
        self.registry.dispatch(&self.ctx, &CommandSource::Console, line).await
    }
}

#[async_trait]
impl SimplePlugin for ModerationPlugin {
    fn name(&self) -> &str {
        "moderation"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn register_handlers(&self, events: Arc<EventSystem>) -> Result<(), PluginError> {
        handlers::register_all(&events, &self.ctx, &self.registry).await?;
        info!("🛡️ Moderation listeners registered, {} commands available", self.registry.names().len());
        Ok(())
    }

    async fn on_init(&self, _host: Arc<dyn ProxyHost>) -> Result<(), PluginError> {
        let relay = ModerationRelay::new(Arc::downgrade(&self.ctx));
        self.ctx.cross.set_relay_handler(Arc::new(relay)).await;
        self.ctx.cross.start().await;
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), PluginError> {
        if self.ctx.maintenance.cancel_schedule().await {
            warn!("⚠️ Scheduled maintenance cancelled by shutdown");
        }
        self.ctx
            .stats
            .flush_sessions()
            .await
            .map_err(|e| PluginError::ShutdownFailed(e.to_string()))?;
        info!("🛡️ Moderation plugin stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
