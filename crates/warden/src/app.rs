//! Main application logic and lifecycle management.
//!
//! [`Application`] wires the storage, cross-proxy and moderation crates
//! into one node, runs the background tasks and the console loop, and
//! tears everything down in phases on shutdown.

use crate::{
    cli::CliArgs,
    config::{AppConfig, FileConfigSource},
    logging::display_banner,
    signals::wait_for_signal,
};
use plugin_moderation::{ModerationContext, ModerationPlugin};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use warden_cross_proxy::{CrossProxyService, MessageBus, RedisBus};
use warden_event_system::{EventSystem, LocalProxy, ProxyHost, ShutdownPhase, ShutdownState, SimplePlugin};
use warden_storage::DatabaseManager;

/// Console lines that stop the node like a signal does.
const STOP_COMMANDS: [&str; 2] = ["stop", "end"];

/// A running Warden node.
pub struct Application {
    config: AppConfig,
    config_path: PathBuf,
    shutdown_state: ShutdownState,
    events: Arc<EventSystem>,
    host: Arc<LocalProxy>,
    cross: Arc<CrossProxyService>,
    db: DatabaseManager,
    plugin: Arc<ModerationPlugin>,
}

impl Application {
    /// Loads and validates the configuration, then connects the database
    /// and the cross-proxy bus and builds the moderation plugin.
    ///
    /// Nothing is dispatched until [`Application::run`].
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(proxy_id) = args.proxy_id {
            config.proxy.id = proxy_id;
        }
        if let Some(database_url) = args.database_url {
            config.database.url = database_url;
        }
        if let Some(redis_url) = args.redis_url {
            config.redis.url = Some(redis_url);
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner(&config.proxy.id);

        let db = DatabaseManager::connect(&config.database).await?;

        let host = Arc::new(LocalProxy::new(config.proxy.id.clone(), config.proxy.servers.clone()));
        let dyn_host: Arc<dyn ProxyHost> = host.clone();

        let cross = match &config.redis.url {
            Some(url) => {
                let bus: Arc<dyn MessageBus> = RedisBus::connect(url, config.redis.channel.as_str()).await?;
                let stale_after_ms = (config.redis.stale_after_secs as i64).saturating_mul(1000);
                CrossProxyService::new(Arc::clone(&dyn_host), Some(bus), stale_after_ms)
            }
            None => {
                info!("🌐 No redis.url configured, running standalone");
                CrossProxyService::disabled(Arc::clone(&dyn_host))
            }
        };

        let ctx = ModerationContext::new(
            &config.moderation,
            db.clone(),
            dyn_host,
            Arc::clone(&cross),
            Some(Arc::new(FileConfigSource::new(&args.config_path))),
        )?;
        let plugin = Arc::new(ModerationPlugin::new(ctx));

        let shutdown_state = ShutdownState::new();
        let events = Arc::new(EventSystem::with_shutdown(shutdown_state.clone()));

        Ok(Self {
            config,
            config_path: args.config_path,
            shutdown_state,
            events,
            host,
            cross,
            db,
            plugin,
        })
    }

    /// Runs until a shutdown signal (or `stop` on the console), then shuts
    /// down in phases.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Warden node");
        self.log_configuration_summary();

        self.plugin.register_handlers(Arc::clone(&self.events)).await?;
        let host: Arc<dyn ProxyHost> = self.host.clone();
        self.plugin.on_init(host).await?;
        info!(
            "🔌 Plugin {} v{} initialized",
            self.plugin.name(),
            self.plugin.version()
        );

        let heartbeat_handle = self.spawn_heartbeat();
        let monitoring_handle = self.spawn_monitoring();
        let mut console_handle = tokio::spawn(run_console(Arc::clone(&self.plugin), self.host.clone()));

        info!("✅ Warden is now running!");
        info!("🔍 Health monitoring active - stats every 60 seconds");
        info!("🛑 Type `stop` or press Ctrl+C to gracefully shutdown");

        tokio::select! {
            result = wait_for_signal() => {
                result?;
            }
            _ = &mut console_handle => {
                info!("🖥️ Stop requested from the console");
            }
        }

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");

        info!("📡 Phase 1: Stopping event dispatch and background tasks...");
        self.shutdown_state.advance(ShutdownPhase::Draining);
        console_handle.abort();
        for (name, handle) in [("heartbeat", heartbeat_handle), ("monitoring", monitoring_handle)] {
            if tokio::time::timeout(std::time::Duration::from_secs(5), handle).await.is_err() {
                warn!("⏰ {} task did not stop in time", name);
            }
        }

        info!("🔌 Phase 2: Shutting down plugins...");
        if let Err(e) = self.plugin.on_shutdown().await {
            error!("❌ Plugin shutdown failed: {}", e);
        } else {
            info!("✅ Plugin shutdown completed successfully");
        }

        info!("🌐 Phase 3: Leaving the proxy network...");
        self.shutdown_state.advance(ShutdownPhase::LeavingNetwork);
        self.cross.shutdown().await;

        info!("🧹 Phase 4: Closing the database pool...");
        self.shutdown_state.advance(ShutdownPhase::Closing);
        self.db.close().await;
        self.shutdown_state.advance(ShutdownPhase::Complete);

        log_final_statistics(&self.events, &self.cross).await;

        info!("✅ Warden shutdown complete");
        Ok(())
    }

    /// Publishes presence heartbeats and prunes stale proxies until the
    /// node starts draining.
    fn spawn_heartbeat(&self) -> JoinHandle<()> {
        let cross = Arc::clone(&self.cross);
        let shutdown = self.shutdown_state.clone();
        let period = std::time::Duration::from_secs(self.config.redis.heartbeat_secs);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => cross.tick().await,
                    _ = shutdown.wait_for(ShutdownPhase::Draining) => break,
                }
            }
        })
    }

    fn spawn_monitoring(&self) -> JoinHandle<()> {
        let events = Arc::clone(&self.events);
        let cross = Arc::clone(&self.cross);
        let host = self.host.clone();
        let shutdown = self.shutdown_state.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
            let mut last_events_emitted = 0u64;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.wait_for(ShutdownPhase::Draining) => break,
                }

                let stats = events.get_stats().await;
                let events_this_period = stats.events_emitted - last_events_emitted;
                last_events_emitted = stats.events_emitted;

                info!(
                    "📊 System Health - {} events/min | {} handlers | {} local players | {} network players",
                    events_this_period,
                    stats.total_handlers,
                    host.online_players().await.len(),
                    cross.online_count()
                );

                if stats.handler_errors > 0 {
                    warn!("⚠️ {} handler errors since startup", stats.handler_errors);
                }
            }
        })
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  📂 Config file: {}", self.config_path.display());
        info!("  🏷️ Proxy: {} | Servers: {}", self.config.proxy.id, self.config.proxy.servers.join(", "));
        info!(
            "  🌐 Cross-proxy: {}",
            if self.cross.is_enabled() { self.config.redis.channel.as_str() } else { "disabled" }
        );
        info!(
            "  📝 Whitelist: {} | Maintenance: {}",
            on_off(self.config.moderation.whitelist.enabled),
            on_off(self.config.moderation.maintenance.enabled)
        );
        info!(
            "  💬 Chat filter: {} | Spam guard: {}",
            on_off(self.config.moderation.chat_filter.enabled),
            on_off(self.config.moderation.spam.enabled)
        );
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

/// Reads commands from stdin and runs them as the console.
///
/// Returns once a stop command is typed. A closed stdin (e.g. running as a
/// service) leaves the node running until a signal arrives.
async fn run_console(plugin: Arc<ModerationPlugin>, host: Arc<LocalProxy>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("⚠️ Console input failed: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if STOP_COMMANDS.contains(&line.to_ascii_lowercase().as_str()) {
            return;
        }
        if line.eq_ignore_ascii_case("help") {
            let names = plugin.registry().names();
            host.send_console(&format!("Commands: {}, stop", names.join(", "))).await;
            continue;
        }
        if !plugin.dispatch_console(line).await {
            host.send_console("Unknown command. Type \"help\" for help.").await;
        }
    }

    std::future::pending::<()>().await;
}

async fn log_final_statistics(events: &EventSystem, cross: &CrossProxyService) {
    info!("📊 Final Statistics:");
    let final_stats = events.get_stats().await;
    info!("  - Total events processed: {}", final_stats.events_emitted);
    info!("  - Events cancelled: {}", final_stats.events_cancelled);
    info!("  - Handler errors: {}", final_stats.handler_errors);
    info!("  - Known proxies at exit: {}", cross.proxies().len());
}
