//! # Proxy Host Abstraction
//!
//! Warden never talks to player connections directly. Everything it needs
//! from the proxy (who is online, sending chat, disconnecting, moving
//! players between backends, permission checks) goes through
//! [`ProxyHost`]. A production proxy implements the trait over its own
//! connection table; [`crate::LocalProxy`] implements it in memory.

use crate::types::{PlayerId, PlayerInfo};
use async_trait::async_trait;

/// Errors reported by a proxy host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The player is not connected to this proxy.
    #[error("Player not connected: {0}")]
    PlayerNotConnected(String),

    /// The backend server is not registered with the proxy.
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    /// The host refused or failed the operation.
    #[error("Host operation failed: {0}")]
    Failed(String),
}

/// Operations Warden needs from the proxy it runs in.
#[async_trait]
pub trait ProxyHost: Send + Sync + 'static {
    /// Identifier of this proxy instance within the network.
    fn proxy_id(&self) -> &str;

    /// Snapshot of every player connected to this proxy.
    async fn online_players(&self) -> Vec<PlayerInfo>;

    /// Looks a player up by name, case-insensitively.
    async fn player_by_name(&self, name: &str) -> Option<PlayerInfo>;

    /// Looks a player up by id.
    async fn player_by_id(&self, id: PlayerId) -> Option<PlayerInfo>;

    /// Sends a chat message to a player.
    async fn send_message(&self, player: PlayerId, message: &str) -> Result<(), HostError>;

    /// Writes a message to the proxy console.
    async fn send_console(&self, message: &str);

    /// Disconnects a player from the proxy with a reason screen.
    async fn disconnect(&self, player: PlayerId, reason: &str) -> Result<(), HostError>;

    /// Moves a player to a backend server.
    async fn connect(&self, player: PlayerId, server: &str) -> Result<(), HostError>;

    /// Permission check as configured on the proxy.
    async fn has_permission(&self, player: PlayerId, permission: &str) -> bool;

    /// Names of the backend servers registered with the proxy.
    fn servers(&self) -> Vec<String>;

    /// Sends a message to every local player, optionally only to those
    /// holding `permission`. Returns how many players received it.
    async fn broadcast(&self, message: &str, permission: Option<&str>) -> usize {
        let mut delivered = 0;
        for player in self.online_players().await {
            if let Some(permission) = permission {
                if !self.has_permission(player.id, permission).await {
                    continue;
                }
            }
            if self.send_message(player.id, message).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}
