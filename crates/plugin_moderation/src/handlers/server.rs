//! Backend routing: permission-guarded servers, presence updates on server
//! switches and lobby fallback when a backend kicks a player.

use crate::context::ModerationContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_event_system::{
    EventError, EventHandler, KickedFromServerEvent, ServerConnectedEvent, ServerPreConnectEvent,
};

pub struct ServerGuardListener {
    ctx: Arc<ModerationContext>,
}

impl ServerGuardListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ServerPreConnectEvent> for ServerGuardListener {
    async fn handle(&self, event: &mut ServerPreConnectEvent) -> Result<(), EventError> {
        let Some(permission) = self.ctx.server_guard.required_permission(&event.target).await else {
            return Ok(());
        };
        if !self.ctx.host.has_permission(event.player.id, &permission).await {
            debug!("{} lacks {} for {}", event.player.name, permission, event.target);
            event.deny(self.ctx.messages.render("server-denied", &[("server", &event.target)]));
        }
        Ok(())
    }
}

pub struct ServerSwitchListener {
    ctx: Arc<ModerationContext>,
}

impl ServerSwitchListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ServerConnectedEvent> for ServerSwitchListener {
    async fn handle(&self, event: &mut ServerConnectedEvent) -> Result<(), EventError> {
        if let Err(e) = self.ctx.cross.player_switched(&event.player, &event.server).await {
            warn!("⚠️ Failed to publish server switch of {}: {}", event.player.name, e);
        }
        self.ctx
            .stats
            .record_server(&event.player, &event.server)
            .await
            .map_err(|e| EventError::HandlerExecution(e.to_string()))
    }
}

/// Sends players kicked from a game server back to a lobby. Kicks from a
/// lobby itself disconnect as usual.
pub struct LobbyFallbackListener {
    ctx: Arc<ModerationContext>,
}

impl LobbyFallbackListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<KickedFromServerEvent> for LobbyFallbackListener {
    async fn handle(&self, event: &mut KickedFromServerEvent) -> Result<(), EventError> {
        if event.redirect.is_some() || self.ctx.server_guard.is_lobby(&event.server).await {
            return Ok(());
        }
        let servers = self.ctx.host.servers();
        let Some(lobby) = self.ctx.server_guard.lobby_for(&servers, Some(&event.server)).await else {
            return Ok(());
        };

        let reason = event.reason.clone().unwrap_or_else(|| "-".to_string());
        let text = self
            .ctx
            .messages
            .render("lobby-redirect", &[("server", &lobby), ("reason", &reason)]);
        if let Err(e) = self.ctx.host.send_message(event.player.id, &text).await {
            warn!("⚠️ Could not message {}: {}", event.player.name, e);
        }
        debug!("Redirecting {} from {} to {}", event.player.name, event.server, lobby);
        event.redirect = Some(lobby);
        Ok(())
    }
}
