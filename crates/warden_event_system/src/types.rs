//! # Core Type Definitions
//!
//! Identifiers and snapshots shared by every Warden crate.
//!
//! - [`PlayerId`] - Unique identifier for a connected player
//! - [`PlayerInfo`] - Snapshot of a player as the proxy sees it
//! - [`CommandSource`] - Who issued a command (console or player)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

/// Name used for actions issued from the proxy console.
pub const CONSOLE_NAME: &str = "CONSOLE";

/// Unique identifier for a player.
///
/// Wrapper around the player's profile UUID so it cannot be confused with
/// other identifiers (report ids, punishment ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a player ID from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a player connected to a proxy.
///
/// Snapshots are cheap to clone and are what events and commands carry
/// around. The live connection stays owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Profile UUID
    pub id: PlayerId,
    /// Current username, original casing
    pub name: String,
    /// Remote address of the client, if known
    pub address: Option<SocketAddr>,
    /// Backend server the player is currently connected to
    pub server: Option<String>,
}

impl PlayerInfo {
    /// Creates a snapshot for a player that is not yet on a backend server.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: None,
            server: None,
        }
    }

    /// Builder-style setter for the client address.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Builder-style setter for the current backend server.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Lowercase name, the key used for every name-based lookup.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Origin of a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    /// The proxy console. Holds every permission.
    Console,
    /// An online player.
    Player(PlayerInfo),
}

impl CommandSource {
    /// Display name used as issuer in records and messages.
    pub fn name(&self) -> &str {
        match self {
            CommandSource::Console => CONSOLE_NAME,
            CommandSource::Player(player) => &player.name,
        }
    }

    /// The player behind this source, if any.
    pub fn player(&self) -> Option<&PlayerInfo> {
        match self {
            CommandSource::Console => None,
            CommandSource::Player(player) => Some(player),
        }
    }

    pub fn is_console(&self) -> bool {
        matches!(self, CommandSource::Console)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_round_trips_through_display() {
        let id = PlayerId::new();
        let parsed: PlayerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_player_info_key_is_lowercase() {
        let info = PlayerInfo::new(PlayerId::new(), "Notch");
        assert_eq!(info.key(), "notch");
        assert!(info.server.is_none());
    }

    #[test]
    fn test_command_source_names() {
        assert_eq!(CommandSource::Console.name(), CONSOLE_NAME);
        let player = PlayerInfo::new(PlayerId::new(), "Alex");
        let source = CommandSource::Player(player.clone());
        assert_eq!(source.name(), "Alex");
        assert_eq!(source.player(), Some(&player));
        assert!(!source.is_console());
    }
}
