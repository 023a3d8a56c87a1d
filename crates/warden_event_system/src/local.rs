//! In-memory [`ProxyHost`] implementation.
//!
//! Backs the headless console node and every listener/command test. It
//! keeps the player table in a `DashMap` and records what would have been
//! sent over the wire so callers can inspect it.

use crate::proxy::{HostError, ProxyHost};
use crate::types::{PlayerId, PlayerInfo};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::info;

/// In-memory proxy host.
#[derive(Debug)]
pub struct LocalProxy {
    proxy_id: String,
    servers: Vec<String>,
    players: DashMap<PlayerId, PlayerInfo>,
    permissions: DashMap<PlayerId, HashSet<String>>,
    messages: Mutex<Vec<(PlayerId, String)>>,
    console: Mutex<Vec<String>>,
    disconnects: Mutex<Vec<(PlayerId, String)>>,
}

impl LocalProxy {
    /// Creates a host with the given id and backend server names.
    pub fn new(proxy_id: impl Into<String>, servers: Vec<String>) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            servers,
            players: DashMap::new(),
            permissions: DashMap::new(),
            messages: Mutex::new(Vec::new()),
            console: Mutex::new(Vec::new()),
            disconnects: Mutex::new(Vec::new()),
        }
    }

    /// Adds a player to the proxy.
    pub fn join(&self, player: PlayerInfo) {
        self.players.insert(player.id, player);
    }

    /// Removes a player from the proxy, returning their last snapshot.
    pub fn leave(&self, id: PlayerId) -> Option<PlayerInfo> {
        self.players.remove(&id).map(|(_, player)| player)
    }

    /// Grants a permission node. `*` grants everything and `warden.*`
    /// grants every node below `warden.`.
    pub fn grant(&self, id: PlayerId, permission: &str) {
        self.permissions
            .entry(id)
            .or_default()
            .insert(permission.to_string());
    }

    /// Messages delivered to a player so far, oldest first.
    pub fn messages_for(&self, id: PlayerId) -> Vec<String> {
        self.lock_messages()
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Every message written to the console so far.
    pub fn console_messages(&self) -> Vec<String> {
        match self.console.lock() {
            Ok(console) => console.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Players disconnected by Warden together with the reason shown.
    pub fn disconnections(&self) -> Vec<(PlayerId, String)> {
        match self.disconnects.lock() {
            Ok(disconnects) => disconnects.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Clears every recorded message, console line and disconnect.
    pub fn clear_outbox(&self) {
        self.lock_messages().clear();
        if let Ok(mut console) = self.console.lock() {
            console.clear();
        }
        if let Ok(mut disconnects) = self.disconnects.lock() {
            disconnects.clear();
        }
    }

    fn lock_messages(&self) -> std::sync::MutexGuard<'_, Vec<(PlayerId, String)>> {
        match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ProxyHost for LocalProxy {
    fn proxy_id(&self) -> &str {
        &self.proxy_id
    }

    async fn online_players(&self) -> Vec<PlayerInfo> {
        let mut players: Vec<PlayerInfo> = self.players.iter().map(|p| p.value().clone()).collect();
        players.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        players
    }

    async fn player_by_name(&self, name: &str) -> Option<PlayerInfo> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value().clone())
    }

    async fn player_by_id(&self, id: PlayerId) -> Option<PlayerInfo> {
        self.players.get(&id).map(|p| p.value().clone())
    }

    async fn send_message(&self, player: PlayerId, message: &str) -> Result<(), HostError> {
        if !self.players.contains_key(&player) {
            return Err(HostError::PlayerNotConnected(player.to_string()));
        }
        self.lock_messages().push((player, message.to_string()));
        Ok(())
    }

    async fn send_console(&self, message: &str) {
        info!("🖥️ {}", message);
        if let Ok(mut console) = self.console.lock() {
            console.push(message.to_string());
        }
    }

    async fn disconnect(&self, player: PlayerId, reason: &str) -> Result<(), HostError> {
        if self.players.remove(&player).is_none() {
            return Err(HostError::PlayerNotConnected(player.to_string()));
        }
        if let Ok(mut disconnects) = self.disconnects.lock() {
            disconnects.push((player, reason.to_string()));
        }
        Ok(())
    }

    async fn connect(&self, player: PlayerId, server: &str) -> Result<(), HostError> {
        let Some(server) = self.servers.iter().find(|s| s.eq_ignore_ascii_case(server)) else {
            return Err(HostError::UnknownServer(server.to_string()));
        };
        let mut entry = self
            .players
            .get_mut(&player)
            .ok_or_else(|| HostError::PlayerNotConnected(player.to_string()))?;
        entry.server = Some(server.clone());
        Ok(())
    }

    async fn has_permission(&self, player: PlayerId, permission: &str) -> bool {
        let Some(granted) = self.permissions.get(&player) else {
            return false;
        };
        granted.iter().any(|node| {
            node == "*"
                || node == permission
                || node
                    .strip_suffix('*')
                    .is_some_and(|prefix| permission.starts_with(prefix))
        })
    }

    fn servers(&self) -> Vec<String> {
        self.servers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> LocalProxy {
        LocalProxy::new("proxy-1", vec!["lobby".to_string(), "survival".to_string()])
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let proxy = proxy();
        let id = PlayerId::new();
        proxy.join(PlayerInfo::new(id, "Notch"));

        assert_eq!(proxy.player_by_name("NOTCH").await.map(|p| p.id), Some(id));
        assert!(proxy.player_by_name("jeb_").await.is_none());
    }

    #[tokio::test]
    async fn test_wildcard_permissions() {
        let proxy = proxy();
        let id = PlayerId::new();
        proxy.join(PlayerInfo::new(id, "Mod"));
        proxy.grant(id, "warden.*");

        assert!(proxy.has_permission(id, "warden.ban").await);
        assert!(!proxy.has_permission(id, "other.node").await);

        proxy.grant(id, "*");
        assert!(proxy.has_permission(id, "other.node").await);
    }

    #[tokio::test]
    async fn test_disconnect_records_reason_and_removes_player() {
        let proxy = proxy();
        let id = PlayerId::new();
        proxy.join(PlayerInfo::new(id, "Griefer"));

        proxy.disconnect(id, "Banned").await.unwrap();
        assert!(proxy.player_by_id(id).await.is_none());
        assert_eq!(proxy.disconnections(), vec![(id, "Banned".to_string())]);
        assert!(proxy.disconnect(id, "again").await.is_err());
    }

    #[tokio::test]
    async fn test_connect_validates_server() {
        let proxy = proxy();
        let id = PlayerId::new();
        proxy.join(PlayerInfo::new(id, "Alex"));

        proxy.connect(id, "Survival").await.unwrap();
        assert_eq!(proxy.player_by_id(id).await.unwrap().server.as_deref(), Some("survival"));
        assert_eq!(
            proxy.connect(id, "creative").await,
            Err(HostError::UnknownServer("creative".to_string()))
        );
    }

    #[tokio::test]
    async fn test_broadcast_respects_permission() {
        let proxy = proxy();
        let staff = PlayerId::new();
        let player = PlayerId::new();
        proxy.join(PlayerInfo::new(staff, "Staff"));
        proxy.join(PlayerInfo::new(player, "Player"));
        proxy.grant(staff, "warden.notify");

        let delivered = proxy.broadcast("hello staff", Some("warden.notify")).await;
        assert_eq!(delivered, 1);
        assert_eq!(proxy.messages_for(staff), vec!["hello staff".to_string()]);
        assert!(proxy.messages_for(player).is_empty());

        assert_eq!(proxy.broadcast("hello all", None).await, 2);
    }
}
