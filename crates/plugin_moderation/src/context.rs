//! # Moderation Context
//!
//! Every service the listeners and commands need, built once from the
//! configuration and shared behind an `Arc`.

use crate::config::{ModerationConfig, ModerationSettings};
use crate::error::ModerationError;
use crate::services::*;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use warden_cross_proxy::CrossProxyService;
use warden_event_system::{CommandSource, ProxyHost};
use warden_storage::{
    DatabaseManager, PlayerStatsRepository, PunishmentRepository, ReportRepository, WhitelistRepository,
};

/// Loads a fresh copy of the feature configuration for `/wardenreload`.
pub trait ConfigSource: Send + Sync + 'static {
    fn load(&self) -> Result<ModerationConfig, String>;
}

pub struct ModerationContext {
    pub host: Arc<dyn ProxyHost>,
    pub cross: Arc<CrossProxyService>,
    pub settings: Arc<RwLock<ModerationSettings>>,
    pub messages: Arc<MessageService>,
    pub legal: LegalService,
    pub punishments: PunishmentService,
    pub reports: ReportService,
    pub whitelist: WhitelistService,
    pub maintenance: Arc<MaintenanceService>,
    pub stats: PlayerStatsService,
    pub chat_filter: ChatFilter,
    pub spam: SpamGuard,
    pub server_guard: ServerGuard,
    pub motd: MotdService,
    /// Lowercase player name -> name of the last private message partner.
    replies: DashMap<String, String>,
    config_source: Option<Arc<dyn ConfigSource>>,
}

impl ModerationContext {
    pub fn new(
        config: &ModerationConfig,
        db: DatabaseManager,
        host: Arc<dyn ProxyHost>,
        cross: Arc<CrossProxyService>,
        config_source: Option<Arc<dyn ConfigSource>>,
    ) -> Result<Arc<Self>, ModerationError> {
        config.validate().map_err(ModerationError::Config)?;

        let settings = Arc::new(RwLock::new(config.moderation.clone()));
        let messages = MessageService::new(&config.messages);

        let punishments = PunishmentService::new(
            PunishmentRepository::new(db.clone()),
            PlayerStatsRepository::new(db.clone()),
            Arc::clone(&host),
            Arc::clone(&cross),
            Arc::clone(&messages),
            Arc::clone(&settings),
        );
        let reports = ReportService::new(
            ReportRepository::new(db.clone()),
            Arc::clone(&host),
            Arc::clone(&cross),
            Arc::clone(&messages),
            &config.reports,
        );
        let whitelist = WhitelistService::new(
            WhitelistRepository::new(db.clone()),
            Arc::clone(&host),
            Arc::clone(&cross),
            config.whitelist.enabled,
        );
        let maintenance = MaintenanceService::new(
            &config.maintenance,
            Arc::clone(&host),
            Arc::clone(&cross),
            Arc::clone(&messages),
        );

        Ok(Arc::new(Self {
            legal: LegalService::new(&config.legal),
            stats: PlayerStatsService::new(PlayerStatsRepository::new(db)),
            chat_filter: ChatFilter::new(&config.chat_filter)?,
            spam: SpamGuard::new(&config.spam),
            server_guard: ServerGuard::new(&config.server_guard),
            motd: MotdService::new(&config.motd),
            host,
            cross,
            settings,
            messages,
            punishments,
            reports,
            whitelist,
            maintenance,
            replies: DashMap::new(),
            config_source,
        }))
    }

    /// Sends a prefixed template to whoever ran a command.
    pub async fn reply(&self, source: &CommandSource, key: &str, vars: &[(&str, &str)]) {
        self.reply_raw(source, &self.messages.render(key, vars)).await;
    }

    pub async fn reply_raw(&self, source: &CommandSource, text: &str) {
        match source {
            CommandSource::Console => self.host.send_console(text).await,
            CommandSource::Player(player) => {
                if let Err(e) = self.host.send_message(player.id, text).await {
                    warn!("⚠️ Could not reply to {}: {}", player.name, e);
                }
            }
        }
    }

    pub fn set_reply_target(&self, player: &str, partner: &str) {
        self.replies.insert(player.to_lowercase(), partner.to_string());
    }

    pub fn reply_target(&self, player: &str) -> Option<String> {
        self.replies.get(&player.to_lowercase()).map(|p| p.clone())
    }

    pub fn forget_reply_target(&self, player: &str) {
        self.replies.remove(&player.to_lowercase());
    }

    /// Re-reads the configuration and applies everything reloadable:
    /// message templates, legal texts, chat filter, spam limits, MOTD,
    /// maintenance texts, report limits and server rules.
    pub async fn reload(&self) -> Result<(), ModerationError> {
        let Some(source) = &self.config_source else {
            return Err(ModerationError::Config("no configuration source to reload from".to_string()));
        };
        let config = source.load().map_err(ModerationError::Config)?;
        self.apply_config(&config).await
    }

    pub async fn apply_config(&self, config: &ModerationConfig) -> Result<(), ModerationError> {
        config.validate().map_err(ModerationError::Config)?;
        self.chat_filter.reload(&config.chat_filter).await?;
        self.messages.reload(&config.messages);
        self.legal.reload(&config.legal).await;
        self.spam.reload(&config.spam).await;
        self.motd.reload(&config.motd).await;
        self.maintenance.reload(&config.maintenance).await;
        self.reports.reload(&config.reports).await;
        self.server_guard.reload(&config.server_guard).await;
        *self.settings.write().await = config.moderation.clone();
        info!("🔄 Moderation configuration reloaded");
        Ok(())
    }
}
