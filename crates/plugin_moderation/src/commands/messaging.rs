//! Private messages, network broadcasts and staff chat.

use super::{Command, CommandRegistry, Invocation};
use crate::context::ModerationContext;
use crate::error::CommandError;
use crate::services::relay::PERMISSION_STAFFCHAT;
use async_trait::async_trait;
use warden_cross_proxy::{CrossProxyMessage, Delivery};

pub fn register(registry: &mut CommandRegistry) {
    registry.register(MsgCommand);
    registry.register(ReplyCommand);
    registry.register(BroadcastCommand);
    registry.register(StaffChatCommand);
}

/// Delivers a private message locally or through the recipient's proxy and
/// links both players for `/reply`.
async fn send_private(ctx: &ModerationContext, inv: &Invocation, to: &str, message: &str) -> Result<(), CommandError> {
    let from = inv.sender();
    if from.eq_ignore_ascii_case(to) {
        ctx.reply(&inv.source, "msg-self", &[]).await;
        return Ok(());
    }

    let recipient = match ctx.cross.send_private(from, to, message).await? {
        Delivery::Local(player) => {
            let text = ctx.messages.raw("msg-received", &[("player", from), ("message", message)]);
            ctx.host.send_message(player.id, &text).await?;
            ctx.set_reply_target(&player.name, from);
            player.name
        }
        Delivery::Remote { name, .. } => name,
    };

    ctx.set_reply_target(from, &recipient);
    let echo = ctx.messages.raw("msg-sent", &[("player", &recipient), ("message", message)]);
    ctx.reply_raw(&inv.source, &echo).await;
    Ok(())
}

pub struct MsgCommand;

#[async_trait]
impl Command for MsgCommand {
    fn name(&self) -> &'static str {
        "msg"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["tell", "w"]
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.msg")
    }

    fn usage(&self) -> &'static str {
        "/msg <player> <message>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let to = inv.require(0)?;
        let message = inv.require_rest(1)?;
        send_private(ctx, inv, to, &message).await
    }
}

pub struct ReplyCommand;

#[async_trait]
impl Command for ReplyCommand {
    fn name(&self) -> &'static str {
        "reply"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["r"]
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.msg")
    }

    fn usage(&self) -> &'static str {
        "/reply <message>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let message = inv.require_rest(0)?;
        let Some(to) = ctx.reply_target(inv.sender()) else {
            ctx.reply(&inv.source, "reply-none", &[]).await;
            return Ok(());
        };
        send_private(ctx, inv, &to, &message).await
    }
}

pub struct BroadcastCommand;

#[async_trait]
impl Command for BroadcastCommand {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["alert"]
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.broadcast")
    }

    fn usage(&self) -> &'static str {
        "/broadcast <message>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let message = inv.require_rest(0)?;
        let text = ctx.messages.raw("broadcast-format", &[("message", &message)]);
        ctx.host.send_console(&text).await;
        ctx.cross.broadcast(&text, None).await?;
        Ok(())
    }
}

pub struct StaffChatCommand;

#[async_trait]
impl Command for StaffChatCommand {
    fn name(&self) -> &'static str {
        "staffchat"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["sc"]
    }

    fn permission(&self) -> Option<&'static str> {
        Some(PERMISSION_STAFFCHAT)
    }

    fn usage(&self) -> &'static str {
        "/staffchat <message>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let message = inv.require_rest(0)?;
        let server = inv.source.player().and_then(|player| player.server.clone());
        ctx.cross
            .relay(CrossProxyMessage::StaffChat {
                from: inv.sender().to_string(),
                server,
                message,
            })
            .await?;
        Ok(())
    }
}
