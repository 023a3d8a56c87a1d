//! Local delivery of relay messages from the cross-proxy service.

use crate::context::ModerationContext;
use async_trait::async_trait;
use std::sync::Weak;
use tracing::debug;
use warden_cross_proxy::{CrossProxyMessage, RelayHandler};

pub const PERMISSION_STAFFCHAT: &str = "warden.staffchat";

/// Holds the context weakly: the context owns the cross-proxy service,
/// which owns this handler.
pub struct ModerationRelay {
    ctx: Weak<ModerationContext>,
}

impl ModerationRelay {
    pub fn new(ctx: Weak<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl RelayHandler for ModerationRelay {
    async fn handle_relay(&self, origin: &str, message: &CrossProxyMessage) {
        let Some(ctx) = self.ctx.upgrade() else {
            return;
        };
        debug!("Delivering {} from {}", message.kind(), origin);

        match message {
            CrossProxyMessage::PrivateMessage { from, to, message } => {
                if let Some(recipient) = ctx.host.player_by_name(to).await {
                    let text = ctx.messages.raw("msg-received", &[("player", from), ("message", message)]);
                    if ctx.host.send_message(recipient.id, &text).await.is_ok() {
                        ctx.set_reply_target(&recipient.name, from);
                    }
                }
            }
            CrossProxyMessage::StaffChat { from, server, message } => {
                let text = ctx.messages.raw(
                    "staffchat-format",
                    &[
                        ("player", from),
                        ("server", server.as_deref().unwrap_or("?")),
                        ("message", message),
                    ],
                );
                ctx.host.send_console(&text).await;
                ctx.host.broadcast(&text, Some(PERMISSION_STAFFCHAT)).await;
            }
            CrossProxyMessage::JoinMe { player, server } => {
                let text = ctx
                    .messages
                    .render("joinme-format", &[("player", player), ("server", server)]);
                ctx.host.broadcast(&text, None).await;
            }
            CrossProxyMessage::WhitelistToggle { enabled, .. } => ctx.whitelist.apply_remote(*enabled),
            CrossProxyMessage::MaintenanceToggle { enabled, .. } => ctx.maintenance.apply_remote(*enabled).await,
            _ => {}
        }
    }
}
