//! Whitelist: persistent name list plus a runtime on/off switch that is
//! kept in sync across proxies.

use crate::error::ModerationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use warden_cross_proxy::{CrossProxyMessage, CrossProxyService};
use warden_event_system::{current_timestamp_millis, PlayerInfo, ProxyHost};
use warden_storage::{WhitelistEntry, WhitelistRepository};

pub const PERMISSION_WHITELIST_BYPASS: &str = "warden.whitelist.bypass";

pub struct WhitelistService {
    repo: WhitelistRepository,
    host: Arc<dyn ProxyHost>,
    cross: Arc<CrossProxyService>,
    enabled: AtomicBool,
}

impl WhitelistService {
    pub fn new(
        repo: WhitelistRepository,
        host: Arc<dyn ProxyHost>,
        cross: Arc<CrossProxyService>,
        enabled: bool,
    ) -> Self {
        Self {
            repo,
            host,
            cross,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Switches the whitelist on this proxy and tells the others.
    pub async fn set_enabled(&self, enabled: bool, by: &str) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!("📋 Whitelist {} by {}", if enabled { "enabled" } else { "disabled" }, by);
        let toggle = CrossProxyMessage::WhitelistToggle {
            enabled,
            by: by.to_string(),
        };
        if let Err(e) = self.cross.publish(toggle).await {
            warn!("⚠️ Failed to relay whitelist toggle: {}", e);
        }
    }

    /// Applies a toggle received from another proxy.
    pub fn apply_remote(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub async fn add(&self, name: &str, by: &str) -> Result<bool, ModerationError> {
        Ok(self.repo.add(name, by, current_timestamp_millis()).await?)
    }

    pub async fn remove(&self, name: &str) -> Result<bool, ModerationError> {
        Ok(self.repo.remove(name).await?)
    }

    pub async fn contains(&self, name: &str) -> Result<bool, ModerationError> {
        Ok(self.repo.contains(name).await?)
    }

    pub async fn list(&self) -> Result<Vec<WhitelistEntry>, ModerationError> {
        Ok(self.repo.list().await?)
    }

    /// Whether `player` may log in under the current whitelist state.
    pub async fn allows(&self, player: &PlayerInfo) -> Result<bool, ModerationError> {
        if !self.is_enabled() || self.host.has_permission(player.id, PERMISSION_WHITELIST_BYPASS).await {
            return Ok(true);
        }
        self.contains(&player.name).await
    }
}
