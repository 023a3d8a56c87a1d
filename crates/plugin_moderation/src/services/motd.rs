//! Server list ping customisation.

use crate::config::{MaintenanceSettings, MotdSettings};
use tokio::sync::RwLock;
use warden_event_system::ServerPing;

/// Protocol number that makes clients render the version text in red.
pub const INCOMPATIBLE_PROTOCOL: i32 = -1;

#[derive(Debug)]
pub struct MotdService {
    settings: RwLock<MotdSettings>,
}

impl MotdService {
    pub fn new(settings: &MotdSettings) -> Self {
        Self {
            settings: RwLock::new(settings.clone()),
        }
    }

    pub async fn reload(&self, settings: &MotdSettings) {
        *self.settings.write().await = settings.clone();
    }

    /// Rewrites a ping response. `network_online` replaces the host's own
    /// count when cross-proxy presence is available. While `maintenance`
    /// is set its MOTD and version text win.
    pub async fn apply(
        &self,
        ping: &mut ServerPing,
        network_online: Option<usize>,
        maintenance: Option<&MaintenanceSettings>,
    ) {
        let settings = self.settings.read().await;

        if let Some(online) = network_online {
            ping.online = online as u32;
        }
        if let Some(max_players) = settings.max_players {
            ping.max_players = max_players;
        }

        match maintenance {
            Some(maintenance) => {
                ping.description = maintenance.motd.clone();
                ping.version_name = maintenance.version_text.clone();
                ping.protocol = INCOMPATIBLE_PROTOCOL;
            }
            None if !settings.lines.is_empty() => {
                ping.description = settings
                    .lines
                    .iter()
                    .take(2)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping() -> ServerPing {
        ServerPing {
            description: "A Velocity Server".to_string(),
            version_name: "Velocity 1.20".to_string(),
            protocol: 763,
            online: 3,
            max_players: 500,
            sample: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_motd_lines_and_network_count() {
        let motd = MotdService::new(&MotdSettings {
            lines: vec!["one".to_string(), "two".to_string(), "three".to_string()],
            max_players: Some(1000),
        });
        let mut ping = ping();
        motd.apply(&mut ping, Some(42), None).await;

        assert_eq!(ping.description, "one\ntwo");
        assert_eq!(ping.online, 42);
        assert_eq!(ping.max_players, 1000);
        assert_eq!(ping.protocol, 763);
    }

    #[tokio::test]
    async fn test_maintenance_overrides_version() {
        let motd = MotdService::new(&MotdSettings::default());
        let maintenance = MaintenanceSettings::default();
        let mut ping = ping();
        motd.apply(&mut ping, None, Some(&maintenance)).await;

        assert_eq!(ping.description, maintenance.motd);
        assert_eq!(ping.version_name, maintenance.version_text);
        assert_eq!(ping.protocol, INCOMPATIBLE_PROTOCOL);
        assert_eq!(ping.online, 3);
    }
}
