//! Per-backend access rules and lobby selection.

use crate::config::ServerGuardSettings;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct ServerGuard {
    rules: RwLock<BTreeMap<String, String>>,
    lobbies: RwLock<Vec<String>>,
}

impl ServerGuard {
    pub fn new(settings: &ServerGuardSettings) -> Self {
        Self {
            rules: RwLock::new(normalize(settings)),
            lobbies: RwLock::new(settings.lobbies.clone()),
        }
    }

    pub async fn reload(&self, settings: &ServerGuardSettings) {
        *self.rules.write().await = normalize(settings);
        *self.lobbies.write().await = settings.lobbies.clone();
    }

    /// Permission needed to join `server`, if it is guarded.
    pub async fn required_permission(&self, server: &str) -> Option<String> {
        self.rules.read().await.get(&server.to_lowercase()).cloned()
    }

    pub async fn is_lobby(&self, server: &str) -> bool {
        self.lobbies
            .read()
            .await
            .iter()
            .any(|lobby| lobby.eq_ignore_ascii_case(server))
    }

    /// First configured lobby that the host knows and that is not `except`.
    pub async fn lobby_for(&self, known_servers: &[String], except: Option<&str>) -> Option<String> {
        let lobbies = self.lobbies.read().await;
        lobbies
            .iter()
            .filter(|lobby| except.map_or(true, |except| !lobby.eq_ignore_ascii_case(except)))
            .find_map(|lobby| {
                known_servers
                    .iter()
                    .find(|server| server.eq_ignore_ascii_case(lobby))
                    .cloned()
            })
    }
}

fn normalize(settings: &ServerGuardSettings) -> BTreeMap<String, String> {
    settings
        .rules
        .iter()
        .map(|(server, permission)| (server.to_lowercase(), permission.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> ServerGuard {
        let mut rules = BTreeMap::new();
        rules.insert("Staff".to_string(), "warden.server.staff".to_string());
        ServerGuard::new(&ServerGuardSettings {
            rules,
            lobbies: vec!["lobby".to_string(), "hub".to_string()],
        })
    }

    #[tokio::test]
    async fn test_rules_are_case_insensitive() {
        let guard = guard();
        assert_eq!(
            guard.required_permission("STAFF").await.as_deref(),
            Some("warden.server.staff")
        );
        assert!(guard.required_permission("survival").await.is_none());
    }

    #[tokio::test]
    async fn test_lobby_selection_skips_kicking_server() {
        let guard = guard();
        let known = vec!["Lobby".to_string(), "hub".to_string(), "survival".to_string()];

        assert_eq!(guard.lobby_for(&known, None).await.as_deref(), Some("Lobby"));
        assert_eq!(guard.lobby_for(&known, Some("lobby")).await.as_deref(), Some("hub"));
        assert!(guard.lobby_for(&["survival".to_string()], None).await.is_none());
        assert!(guard.is_lobby("HUB").await);
    }
}
