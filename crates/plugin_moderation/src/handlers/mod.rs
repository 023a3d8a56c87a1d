//! # Event Listeners
//!
//! Everything Warden does in reaction to proxy events. [`register_all`]
//! wires every listener at its priority.

pub mod chat;
pub mod connection;
pub mod ping;
pub mod server;

use crate::commands::CommandRegistry;
use crate::context::ModerationContext;
use std::sync::Arc;
use warden_event_system::{EventError, EventPriority, EventSystem};

pub use chat::{
    CommandListener, FilterListener, MuteListener, MutedCommandListener, SpamListener, StaffChatListener,
};
pub use connection::{DisconnectListener, LoginListener, PostLoginListener};
pub use ping::PingListener;
pub use server::{LobbyFallbackListener, ServerGuardListener, ServerSwitchListener};

pub async fn register_all(
    events: &EventSystem,
    ctx: &Arc<ModerationContext>,
    registry: &Arc<CommandRegistry>,
) -> Result<(), EventError> {
    let c = || Arc::clone(ctx);

    events.on("warden:login", EventPriority::First, LoginListener::new(c())).await?;
    events.on("warden:post_login", EventPriority::Normal, PostLoginListener::new(c())).await?;
    events.on("warden:disconnect", EventPriority::Last, DisconnectListener::new(c())).await?;

    events.on("warden:mute", EventPriority::First, MuteListener::new(c())).await?;
    events.on("warden:spam", EventPriority::Early, SpamListener::new(c())).await?;
    events.on("warden:staffchat", EventPriority::Normal, StaffChatListener::new(c())).await?;
    events.on("warden:chatfilter", EventPriority::Late, FilterListener::new(c())).await?;

    events.on("warden:muted_commands", EventPriority::First, MutedCommandListener::new(c())).await?;
    events
        .on("warden:commands", EventPriority::Late, CommandListener::new(c(), Arc::clone(registry)))
        .await?;

    events.on("warden:server_guard", EventPriority::Normal, ServerGuardListener::new(c())).await?;
    events.on("warden:server_switch", EventPriority::Normal, ServerSwitchListener::new(c())).await?;
    events.on("warden:lobby_fallback", EventPriority::Normal, LobbyFallbackListener::new(c())).await?;

    events.on("warden:ping", EventPriority::Normal, PingListener::new(c())).await?;
    Ok(())
}
