//! # Presence Registry
//!
//! Network-wide view of who is online where. Keys are lowercase player
//! names. Every proxy's last heartbeat is tracked so a proxy that dies
//! without announcing `ProxyShutdown` is dropped once its heartbeat goes
//! stale.

use crate::protocol::RemotePlayer;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use warden_event_system::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub id: PlayerId,
    pub name: String,
    pub proxy: String,
    pub server: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    players: DashMap<String, PresenceEntry>,
    heartbeats: DashMap<String, i64>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, proxy: &str, player: &RemotePlayer, now: i64) {
        self.players.insert(
            player.name.to_lowercase(),
            PresenceEntry {
                id: player.id,
                name: player.name.clone(),
                proxy: proxy.to_string(),
                server: player.server.clone(),
                updated_at: now,
            },
        );
        self.touch(proxy, now);
    }

    pub fn switch(&self, proxy: &str, id: PlayerId, name: &str, server: &str, now: i64) {
        self.upsert(
            proxy,
            &RemotePlayer {
                id,
                name: name.to_string(),
                server: Some(server.to_string()),
            },
            now,
        );
    }

    /// Removes a player, unless they have since been seen on another proxy.
    pub fn remove(&self, proxy: &str, name: &str) -> Option<PresenceEntry> {
        self.players
            .remove_if(&name.to_lowercase(), |_, entry| entry.proxy == proxy)
            .map(|(_, entry)| entry)
    }

    /// Replaces everything known about `proxy` with its full player list.
    pub fn replace_proxy(&self, proxy: &str, players: &[RemotePlayer], now: i64) {
        let current: HashSet<String> = players.iter().map(|p| p.name.to_lowercase()).collect();
        self.players
            .retain(|key, entry| entry.proxy != proxy || current.contains(key));
        for player in players {
            self.upsert(proxy, player, now);
        }
        self.touch(proxy, now);
    }

    /// Forgets a proxy and every player on it. Returns how many players
    /// were dropped.
    pub fn remove_proxy(&self, proxy: &str) -> usize {
        let before = self.players.len();
        self.players.retain(|_, entry| entry.proxy != proxy);
        self.heartbeats.remove(proxy);
        before.saturating_sub(self.players.len())
    }

    pub fn touch(&self, proxy: &str, now: i64) {
        self.heartbeats.insert(proxy.to_string(), now);
    }

    /// Drops proxies whose last heartbeat is older than `stale_after_ms`,
    /// never `keep`. Returns the dropped proxy ids.
    pub fn prune(&self, now: i64, stale_after_ms: i64, keep: &str) -> Vec<String> {
        let stale: Vec<String> = self
            .heartbeats
            .iter()
            .filter(|entry| entry.key() != keep && now - *entry.value() > stale_after_ms)
            .map(|entry| entry.key().clone())
            .collect();
        for proxy in &stale {
            self.remove_proxy(proxy);
        }
        stale
    }

    pub fn find(&self, name: &str) -> Option<PresenceEntry> {
        self.players.get(&name.to_lowercase()).map(|e| e.value().clone())
    }

    /// Every known player, sorted by name.
    pub fn players(&self) -> Vec<PresenceEntry> {
        let mut players: Vec<PresenceEntry> = self.players.iter().map(|e| e.value().clone()).collect();
        players.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        players
    }

    /// Player names grouped by backend server, servers sorted.
    pub fn by_server(&self) -> BTreeMap<String, Vec<String>> {
        let mut servers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in self.players() {
            let server = entry.server.unwrap_or_else(|| "?".to_string());
            servers.entry(server).or_default().push(entry.name);
        }
        servers
    }

    /// Known proxies with their last heartbeat, sorted by id.
    pub fn proxies(&self) -> Vec<(String, i64)> {
        let mut proxies: Vec<(String, i64)> =
            self.heartbeats.iter().map(|e| (e.key().clone(), *e.value())).collect();
        proxies.sort();
        proxies
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str, server: Option<&str>) -> RemotePlayer {
        RemotePlayer {
            id: PlayerId::new(),
            name: name.to_string(),
            server: server.map(str::to_string),
        }
    }

    #[test]
    fn test_remove_ignores_player_seen_elsewhere() {
        let registry = PresenceRegistry::new();
        let steve = remote("Steve", None);
        registry.upsert("proxy-1", &steve, 1);
        // Steve reconnects through proxy-2 before proxy-1 reports the quit.
        registry.upsert("proxy-2", &steve, 2);

        assert!(registry.remove("proxy-1", "steve").is_none());
        assert_eq!(registry.find("STEVE").unwrap().proxy, "proxy-2");
        assert!(registry.remove("proxy-2", "Steve").is_some());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_heartbeat_replaces_proxy_players() {
        let registry = PresenceRegistry::new();
        registry.upsert("proxy-1", &remote("Alex", Some("lobby")), 1);
        registry.upsert("proxy-1", &remote("Ghost", Some("lobby")), 1);
        registry.upsert("proxy-2", &remote("Notch", Some("survival")), 1);

        registry.replace_proxy("proxy-1", &[remote("Alex", Some("survival"))], 5);

        assert!(registry.find("ghost").is_none());
        assert_eq!(registry.find("alex").unwrap().server.as_deref(), Some("survival"));
        assert!(registry.find("notch").is_some());

        let by_server = registry.by_server();
        assert_eq!(by_server["survival"], vec!["Alex".to_string(), "Notch".to_string()]);
    }

    #[test]
    fn test_prune_drops_stale_proxies_but_keeps_self() {
        let registry = PresenceRegistry::new();
        registry.upsert("self", &remote("Me", None), 0);
        registry.upsert("dead", &remote("Zombie", None), 0);
        registry.upsert("alive", &remote("Alive", None), 9_000);

        let pruned = registry.prune(10_000, 5_000, "self");
        assert_eq!(pruned, vec!["dead".to_string()]);
        assert!(registry.find("zombie").is_none());
        assert!(registry.find("me").is_some());
        assert_eq!(
            registry.proxies().into_iter().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["alive".to_string(), "self".to_string()]
        );
    }
}
