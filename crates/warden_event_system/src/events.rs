//! # Event Traits and Proxy Events
//!
//! This module defines the event infrastructure and every event the host
//! proxy feeds into Warden. Unlike fire-and-forget notifications, proxy
//! events carry a *result* that handlers may change: a login can be denied,
//! a chat line rewritten or cancelled, a server connection refused.
//!
//! ## Event Categories
//!
//! - **Connection**: [`LoginEvent`], [`PostLoginEvent`], [`DisconnectEvent`]
//! - **Chat**: [`ChatEvent`], [`CommandExecuteEvent`]
//! - **Routing**: [`ServerPreConnectEvent`], [`ServerConnectedEvent`], [`KickedFromServerEvent`]
//! - **Status**: [`ProxyPingEvent`]

use crate::types::PlayerInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// ============================================================================
// Event Traits and Core Infrastructure
// ============================================================================

/// Core trait that all proxy events implement.
///
/// Events must be Send + Sync as handlers run on the tokio runtime, and
/// Debug so they can be logged when a handler fails.
pub trait ProxyEvent: Send + Sync + Debug + 'static {
    /// Stable identifier used in logs and statistics.
    const NAME: &'static str;

    /// Whether the event has been cancelled or denied.
    ///
    /// The event system stops dispatching to later handlers once this
    /// returns true.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Handler for a single event type.
///
/// Handlers receive the event mutably and may change its result. Returning
/// an error is logged by the event system; it does not stop dispatch.
#[async_trait]
pub trait EventHandler<E: ProxyEvent>: Send + Sync + 'static {
    async fn handle(&self, event: &mut E) -> Result<(), EventError>;
}

/// Dispatch order of a handler. Lower variants run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    First,
    Early,
    Normal,
    Late,
    Last,
}

impl Default for EventPriority {
    fn default() -> Self {
        EventPriority::Normal
    }
}

/// Errors that can occur during event registration and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The event system no longer accepts registrations or emissions.
    #[error("Event system is shutting down")]
    ShuttingDown,

    /// A handler failed while processing an event.
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),

    /// A handler needed a service that is not available.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Connection Events
// ============================================================================

/// Outcome of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginResult {
    Allowed,
    Denied { reason: String },
}

/// Fired when a player finished authentication but before they are placed
/// on a backend server. Denying it disconnects the player with the reason.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub player: PlayerInfo,
    pub result: LoginResult,
}

impl LoginEvent {
    pub fn new(player: PlayerInfo) -> Self {
        Self {
            player,
            result: LoginResult::Allowed,
        }
    }

    /// Denies the login with a disconnect reason.
    pub fn deny(&mut self, reason: impl Into<String>) {
        self.result = LoginResult::Denied {
            reason: reason.into(),
        };
    }

    /// The reason the login was denied, if it was.
    pub fn denial_reason(&self) -> Option<&str> {
        match &self.result {
            LoginResult::Allowed => None,
            LoginResult::Denied { reason } => Some(reason),
        }
    }
}

impl ProxyEvent for LoginEvent {
    const NAME: &'static str = "login";

    fn is_cancelled(&self) -> bool {
        matches!(self.result, LoginResult::Denied { .. })
    }
}

/// Fired once the login was accepted and the player is part of the proxy.
#[derive(Debug, Clone)]
pub struct PostLoginEvent {
    pub player: PlayerInfo,
}

impl ProxyEvent for PostLoginEvent {
    const NAME: &'static str = "post_login";
}

/// Fired when a player leaves the proxy, for whatever reason.
#[derive(Debug, Clone)]
pub struct DisconnectEvent {
    pub player: PlayerInfo,
}

impl ProxyEvent for DisconnectEvent {
    const NAME: &'static str = "disconnect";
}

// ============================================================================
// Chat Events
// ============================================================================

/// A chat line typed by a player. Handlers may rewrite `message` or
/// cancel the line entirely.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub player: PlayerInfo,
    pub message: String,
    pub cancelled: bool,
}

impl ChatEvent {
    pub fn new(player: PlayerInfo, message: impl Into<String>) -> Self {
        Self {
            player,
            message: message.into(),
            cancelled: false,
        }
    }
}

impl ProxyEvent for ChatEvent {
    const NAME: &'static str = "chat";

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A command typed by a player, before the proxy or a backend handles it.
/// `command_line` excludes the leading slash.
#[derive(Debug, Clone)]
pub struct CommandExecuteEvent {
    pub player: PlayerInfo,
    pub command_line: String,
    pub cancelled: bool,
}

impl CommandExecuteEvent {
    pub fn new(player: PlayerInfo, command_line: impl Into<String>) -> Self {
        Self {
            player,
            command_line: command_line.into(),
            cancelled: false,
        }
    }

    /// Lowercase command label without arguments.
    pub fn label(&self) -> String {
        self.command_line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_lowercase()
    }
}

impl ProxyEvent for CommandExecuteEvent {
    const NAME: &'static str = "command_execute";

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

// ============================================================================
// Routing Events
// ============================================================================

/// Outcome of a backend connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerConnectResult {
    Allowed,
    Denied { reason: String },
}

/// Fired before a player is connected to a backend server.
#[derive(Debug, Clone)]
pub struct ServerPreConnectEvent {
    pub player: PlayerInfo,
    pub target: String,
    pub result: ServerConnectResult,
}

impl ServerPreConnectEvent {
    pub fn new(player: PlayerInfo, target: impl Into<String>) -> Self {
        Self {
            player,
            target: target.into(),
            result: ServerConnectResult::Allowed,
        }
    }

    pub fn deny(&mut self, reason: impl Into<String>) {
        self.result = ServerConnectResult::Denied {
            reason: reason.into(),
        };
    }
}

impl ProxyEvent for ServerPreConnectEvent {
    const NAME: &'static str = "server_pre_connect";

    fn is_cancelled(&self) -> bool {
        matches!(self.result, ServerConnectResult::Denied { .. })
    }
}

/// Fired after a player has been placed on a backend server.
#[derive(Debug, Clone)]
pub struct ServerConnectedEvent {
    pub player: PlayerInfo,
    pub previous: Option<String>,
    pub server: String,
}

impl ProxyEvent for ServerConnectedEvent {
    const NAME: &'static str = "server_connected";
}

/// Fired when a backend server kicks a player. Setting `redirect` moves
/// the player to that server instead of disconnecting them.
#[derive(Debug, Clone)]
pub struct KickedFromServerEvent {
    pub player: PlayerInfo,
    pub server: String,
    pub reason: Option<String>,
    pub redirect: Option<String>,
}

impl ProxyEvent for KickedFromServerEvent {
    const NAME: &'static str = "kicked_from_server";
}

// ============================================================================
// Status Events
// ============================================================================

/// Server list ping response the proxy is about to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPing {
    /// MOTD, lines separated by `\n`
    pub description: String,
    /// Version label shown by clients when the protocol mismatches
    pub version_name: String,
    /// Protocol number; `-1` forces clients to display `version_name`
    pub protocol: i32,
    pub online: u32,
    pub max_players: u32,
    /// Player names shown when hovering the player count
    pub sample: Vec<String>,
}

/// Fired for every server list ping.
#[derive(Debug, Clone)]
pub struct ProxyPingEvent {
    pub ping: ServerPing,
}

impl ProxyEvent for ProxyPingEvent {
    const NAME: &'static str = "proxy_ping";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerId;

    fn alex() -> PlayerInfo {
        PlayerInfo::new(PlayerId::new(), "Alex")
    }

    #[test]
    fn test_login_deny_marks_cancelled() {
        let mut event = LoginEvent::new(alex());
        assert!(!event.is_cancelled());
        assert!(event.denial_reason().is_none());

        event.deny("You are banned");
        assert!(event.is_cancelled());
        assert_eq!(event.denial_reason(), Some("You are banned"));
    }

    #[test]
    fn test_command_label_strips_slash_and_args() {
        let event = CommandExecuteEvent::new(alex(), "/MSG Steve hello there");
        assert_eq!(event.label(), "msg");

        let empty = CommandExecuteEvent::new(alex(), "");
        assert_eq!(empty.label(), "");
    }

    #[test]
    fn test_priority_ordering() {
        let mut priorities = vec![
            EventPriority::Last,
            EventPriority::Normal,
            EventPriority::First,
            EventPriority::Late,
            EventPriority::Early,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                EventPriority::First,
                EventPriority::Early,
                EventPriority::Normal,
                EventPriority::Late,
                EventPriority::Last,
            ]
        );
    }

    #[test]
    fn test_server_pre_connect_deny() {
        let mut event = ServerPreConnectEvent::new(alex(), "staff");
        event.deny("No access");
        assert!(event.is_cancelled());
    }
}
