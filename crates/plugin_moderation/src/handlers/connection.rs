//! # Connection Listeners
//!
//! Login gatekeeping (bans, maintenance, whitelist) and presence/statistics
//! bookkeeping on join and quit.
//!
//! ## Login Order
//!
//! 1. Active ban: denied with the ban screen
//! 2. Maintenance: denied unless bypassed
//! 3. Whitelist: denied unless listed or bypassed
//!
//! A storage failure during the ban or whitelist check denies the login.

use crate::context::ModerationContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};
use warden_event_system::{
    current_timestamp_millis, DisconnectEvent, EventError, EventHandler, LoginEvent, PostLoginEvent,
};

pub struct LoginListener {
    ctx: Arc<ModerationContext>,
}

impl LoginListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<LoginEvent> for LoginListener {
    async fn handle(&self, event: &mut LoginEvent) -> Result<(), EventError> {
        let ctx = &self.ctx;
        let player = &event.player;

        match ctx.punishments.active_ban(&player.name).await {
            Ok(Some(ban)) => {
                let screen = ctx.punishments.ban_screen(&ban, current_timestamp_millis());
                debug!("Refusing banned player {}", player.name);
                event.deny(screen);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                error!("❌ Ban check failed for {}: {}", player.name, e);
                event.deny(ctx.messages.raw("internal-error", &[]));
                return Err(EventError::HandlerExecution(e.to_string()));
            }
        }

        if ctx.maintenance.is_enabled() && !ctx.maintenance.may_join(player).await {
            event.deny(ctx.messages.raw("maintenance-kick", &[]));
            return Ok(());
        }

        match ctx.whitelist.allows(player).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                event.deny(ctx.messages.raw("whitelist-kick", &[]));
                Ok(())
            }
            Err(e) => {
                error!("❌ Whitelist check failed for {}: {}", player.name, e);
                event.deny(ctx.messages.raw("internal-error", &[]));
                Err(EventError::HandlerExecution(e.to_string()))
            }
        }
    }
}

pub struct PostLoginListener {
    ctx: Arc<ModerationContext>,
}

impl PostLoginListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<PostLoginEvent> for PostLoginListener {
    async fn handle(&self, event: &mut PostLoginEvent) -> Result<(), EventError> {
        if let Err(e) = self.ctx.cross.player_joined(&event.player).await {
            warn!("⚠️ Failed to publish join of {}: {}", event.player.name, e);
        }
        self.ctx
            .stats
            .record_join(&event.player)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))
    }
}

pub struct DisconnectListener {
    ctx: Arc<ModerationContext>,
}

impl DisconnectListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<DisconnectEvent> for DisconnectListener {
    async fn handle(&self, event: &mut DisconnectEvent) -> Result<(), EventError> {
        let player = &event.player;
        self.ctx.spam.forget(player.id);
        self.ctx.forget_reply_target(&player.name);
        if let Err(e) = self.ctx.cross.player_quit(player).await {
            warn!("⚠️ Failed to publish quit of {}: {}", player.name, e);
        }
        self.ctx
            .stats
            .record_quit(player)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))
    }
}
