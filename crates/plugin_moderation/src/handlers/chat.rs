//! # Chat Listeners
//!
//! | Priority | Listener | Effect |
//! |----------|----------|--------|
//! | First | [`MuteListener`] | muted players cannot chat |
//! | Early | [`SpamListener`] | burst throttle |
//! | Normal | [`StaffChatListener`] | prefixed lines go to staff chat |
//! | Late | [`FilterListener`] | word and pattern filter |
//!
//! Commands get the same treatment: [`MutedCommandListener`] blocks
//! messaging commands for muted players before [`CommandListener`] runs
//! Warden's own commands.

use crate::commands::CommandRegistry;
use crate::context::ModerationContext;
use crate::services::chat_filter::PERMISSION_CHATFILTER_BYPASS;
use crate::services::relay::PERMISSION_STAFFCHAT;
use crate::services::spam::PERMISSION_SPAM_BYPASS;
use crate::services::{FilterOutcome, SpamVerdict};
use crate::duration::format_duration;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use warden_cross_proxy::CrossProxyMessage;
use warden_event_system::{
    current_timestamp_millis, ChatEvent, CommandExecuteEvent, CommandSource, EventError, EventHandler,
    PlayerInfo,
};

async fn tell(ctx: &ModerationContext, player: &PlayerInfo, text: &str) {
    if let Err(e) = ctx.host.send_message(player.id, text).await {
        warn!("⚠️ Could not message {}: {}", player.name, e);
    }
}

pub struct MuteListener {
    ctx: Arc<ModerationContext>,
}

impl MuteListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ChatEvent> for MuteListener {
    async fn handle(&self, event: &mut ChatEvent) -> Result<(), EventError> {
        let mute = self
            .ctx
            .punishments
            .active_mute(&event.player.name)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))?;

        if let Some(mute) = mute {
            event.cancelled = true;
            let notice = self.ctx.punishments.mute_notice(&mute, current_timestamp_millis());
            tell(&self.ctx, &event.player, &notice).await;
        }
        Ok(())
    }
}

pub struct SpamListener {
    ctx: Arc<ModerationContext>,
}

impl SpamListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ChatEvent> for SpamListener {
    async fn handle(&self, event: &mut ChatEvent) -> Result<(), EventError> {
        if self.ctx.host.has_permission(event.player.id, PERMISSION_SPAM_BYPASS).await {
            return Ok(());
        }
        if let SpamVerdict::Throttled { remaining } = self.ctx.spam.check(event.player.id).await {
            event.cancelled = true;
            let text = self
                .ctx
                .messages
                .render("spam-throttled", &[("remaining", &format_duration(remaining))]);
            tell(&self.ctx, &event.player, &text).await;
        }
        Ok(())
    }
}

pub struct StaffChatListener {
    ctx: Arc<ModerationContext>,
}

impl StaffChatListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ChatEvent> for StaffChatListener {
    async fn handle(&self, event: &mut ChatEvent) -> Result<(), EventError> {
        let prefix = self.ctx.settings.read().await.staff_chat_prefix.clone();
        if prefix.is_empty() {
            return Ok(());
        }
        let Some(body) = event.message.strip_prefix(prefix.as_str()) else {
            return Ok(());
        };
        let body = body.trim();
        if body.is_empty() || !self.ctx.host.has_permission(event.player.id, PERMISSION_STAFFCHAT).await {
            return Ok(());
        }

        let message = CrossProxyMessage::StaffChat {
            from: event.player.name.clone(),
            server: event.player.server.clone(),
            message: body.to_string(),
        };
        event.cancelled = true;
        self.ctx
            .cross
            .relay(message)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))
    }
}

pub struct FilterListener {
    ctx: Arc<ModerationContext>,
}

impl FilterListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ChatEvent> for FilterListener {
    async fn handle(&self, event: &mut ChatEvent) -> Result<(), EventError> {
        if self
            .ctx
            .host
            .has_permission(event.player.id, PERMISSION_CHATFILTER_BYPASS)
            .await
        {
            return Ok(());
        }
        match self.ctx.chat_filter.check(&event.message).await {
            FilterOutcome::Clean => {}
            FilterOutcome::Replaced(filtered) => event.message = filtered,
            FilterOutcome::Blocked => {
                event.cancelled = true;
                let text = self.ctx.messages.render("chat-filtered", &[]);
                tell(&self.ctx, &event.player, &text).await;
            }
        }
        Ok(())
    }
}

pub struct MutedCommandListener {
    ctx: Arc<ModerationContext>,
}

impl MutedCommandListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<CommandExecuteEvent> for MutedCommandListener {
    async fn handle(&self, event: &mut CommandExecuteEvent) -> Result<(), EventError> {
        let label = event.label();
        let blocked = self
            .ctx
            .settings
            .read()
            .await
            .muted_blocked_commands
            .iter()
            .any(|command| command.eq_ignore_ascii_case(&label));
        if !blocked {
            return Ok(());
        }

        let muted = self
            .ctx
            .punishments
            .is_muted(&event.player.name)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))?;
        if muted {
            event.cancelled = true;
            let text = self
                .ctx
                .messages
                .render("command-blocked-muted", &[("command", &label)]);
            tell(&self.ctx, &event.player, &text).await;
        }
        Ok(())
    }
}

/// Runs Warden commands typed by players. Consumed commands are cancelled
/// so the proxy does not forward them to the backend.
pub struct CommandListener {
    ctx: Arc<ModerationContext>,
    registry: Arc<CommandRegistry>,
}

impl CommandListener {
    pub fn new(ctx: Arc<ModerationContext>, registry: Arc<CommandRegistry>) -> Self {
        Self { ctx, registry }
    }
}

#[async_trait]
impl EventHandler<CommandExecuteEvent> for CommandListener {
    async fn handle(&self, event: &mut CommandExecuteEvent) -> Result<(), EventError> {
        if self.registry.get(&event.label()).is_none() {
            return Ok(());
        }
        event.cancelled = true;
        let source = CommandSource::Player(event.player.clone());
        self.registry.dispatch(&self.ctx, &source, &event.command_line).await;
        Ok(())
    }
}
