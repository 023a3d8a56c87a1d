//! Network-wide lookups and server switching: `/find`, `/glist`, `/send`,
//! `/server`, `/lobby`, `/joinme` and `/ping`.

use super::{Command, CommandRegistry, Invocation};
use crate::context::ModerationContext;
use crate::error::{CommandError, ModerationError};
use async_trait::async_trait;
use warden_cross_proxy::CrossProxyMessage;

pub fn register(registry: &mut CommandRegistry) {
    registry.register(FindCommand);
    registry.register(GlistCommand);
    registry.register(SendCommand);
    registry.register(ServerCommand);
    registry.register(LobbyCommand);
    registry.register(JoinMeCommand);
    registry.register(PingCommand);
}

/// Canonical spelling of a backend registered with the host.
fn known_server(ctx: &ModerationContext, name: &str) -> Option<String> {
    ctx.host
        .servers()
        .into_iter()
        .find(|server| server.eq_ignore_ascii_case(name))
}

pub struct FindCommand;

#[async_trait]
impl Command for FindCommand {
    fn name(&self) -> &'static str {
        "find"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.find")
    }

    fn usage(&self) -> &'static str {
        "/find <player>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let entry = ctx
            .cross
            .find(target)
            .ok_or_else(|| ModerationError::PlayerNotFound(target.to_string()))?;
        ctx.reply(
            &inv.source,
            "find-result",
            &[
                ("player", &entry.name),
                ("server", entry.server.as_deref().unwrap_or("?")),
                ("proxy", &entry.proxy),
            ],
        )
        .await;
        Ok(())
    }
}

pub struct GlistCommand;

#[async_trait]
impl Command for GlistCommand {
    fn name(&self) -> &'static str {
        "glist"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.glist")
    }

    fn usage(&self) -> &'static str {
        "/glist"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let servers = ctx.cross.global_list();
        let proxies = ctx.cross.proxies().len().max(1);
        ctx.reply(
            &inv.source,
            "glist-header",
            &[
                ("count", &ctx.cross.online_count().to_string()),
                ("proxies", &proxies.to_string()),
            ],
        )
        .await;
        for (server, mut players) in servers {
            players.sort_by_key(|name| name.to_lowercase());
            let line = ctx.messages.raw(
                "glist-entry",
                &[
                    ("server", &server),
                    ("count", &players.len().to_string()),
                    ("players", &players.join(", ")),
                ],
            );
            ctx.reply_raw(&inv.source, &line).await;
        }
        Ok(())
    }
}

/// Moves a player connected to this proxy to another backend.
pub struct SendCommand;

#[async_trait]
impl Command for SendCommand {
    fn name(&self) -> &'static str {
        "send"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.send")
    }

    fn usage(&self) -> &'static str {
        "/send <player> <server>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let target = inv.require(0)?;
        let requested = inv.require(1)?;
        let Some(server) = known_server(ctx, requested) else {
            ctx.reply(&inv.source, "unknown-server", &[("server", requested)]).await;
            return Ok(());
        };
        let player = ctx
            .host
            .player_by_name(target)
            .await
            .ok_or_else(|| ModerationError::PlayerNotFound(target.to_string()))?;

        ctx.host.connect(player.id, &server).await?;
        ctx.reply(&inv.source, "send-success", &[("player", &player.name), ("server", &server)])
            .await;
        Ok(())
    }
}

pub struct ServerCommand;

#[async_trait]
impl Command for ServerCommand {
    fn name(&self) -> &'static str {
        "server"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.server")
    }

    fn usage(&self) -> &'static str {
        "/server [name]"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let Some(requested) = inv.arg(0) else {
            let servers = ctx.host.servers().join(", ");
            ctx.reply(&inv.source, "server-list", &[("servers", &servers)]).await;
            return Ok(());
        };
        let player = inv.player()?;
        let Some(server) = known_server(ctx, requested) else {
            ctx.reply(&inv.source, "unknown-server", &[("server", requested)]).await;
            return Ok(());
        };

        if let Some(node) = ctx.server_guard.required_permission(&server).await {
            if !ctx.host.has_permission(player.id, &node).await {
                ctx.reply(&inv.source, "server-denied", &[("server", &server)]).await;
                return Ok(());
            }
        }
        ctx.reply(&inv.source, "server-connecting", &[("server", &server)]).await;
        ctx.host.connect(player.id, &server).await?;
        Ok(())
    }
}

pub struct LobbyCommand;

#[async_trait]
impl Command for LobbyCommand {
    fn name(&self) -> &'static str {
        "lobby"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["hub"]
    }

    fn permission(&self) -> Option<&'static str> {
        None
    }

    fn usage(&self) -> &'static str {
        "/lobby"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let player = inv.player()?;
        let servers = ctx.host.servers();
        let Some(lobby) = ctx.server_guard.lobby_for(&servers, player.server.as_deref()).await else {
            ctx.reply(&inv.source, "lobby-none", &[]).await;
            return Ok(());
        };
        ctx.reply(&inv.source, "server-connecting", &[("server", &lobby)]).await;
        ctx.host.connect(player.id, &lobby).await?;
        Ok(())
    }
}

pub struct JoinMeCommand;

#[async_trait]
impl Command for JoinMeCommand {
    fn name(&self) -> &'static str {
        "joinme"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.joinme")
    }

    fn usage(&self) -> &'static str {
        "/joinme"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let player = inv.player()?;
        let Some(server) = player.server.clone() else {
            ctx.reply(&inv.source, "joinme-no-server", &[]).await;
            return Ok(());
        };
        ctx.cross
            .relay(CrossProxyMessage::JoinMe {
                player: player.name.clone(),
                server,
            })
            .await?;
        Ok(())
    }
}

pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn permission(&self) -> Option<&'static str> {
        None
    }

    fn usage(&self) -> &'static str {
        "/ping"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let online = ctx.host.online_players().await.len();
        ctx.reply(
            &inv.source,
            "ping-result",
            &[
                ("proxy", ctx.host.proxy_id()),
                ("online", &online.to_string()),
                ("network", &ctx.cross.online_count().to_string()),
            ],
        )
        .await;
        Ok(())
    }
}
