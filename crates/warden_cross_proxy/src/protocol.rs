//! # Wire Protocol
//!
//! Every message between proxies is an [`Envelope`] serialized as JSON and
//! published on a single Redis channel. The message itself is internally
//! tagged:
//!
//! ```json
//! {"origin":"proxy-1","sent_at":1700000000000,
//!  "message":{"type":"player_switch","id":"…","name":"Steve","server":"survival"}}
//! ```

use serde::{Deserialize, Serialize};
use warden_event_system::{PlayerId, PlayerInfo};

/// Presence as relayed between proxies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlayer {
    pub id: PlayerId,
    pub name: String,
    pub server: Option<String>,
}

impl From<&PlayerInfo> for RemotePlayer {
    fn from(player: &PlayerInfo) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            server: player.server.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossProxyMessage {
    PlayerJoin {
        player: RemotePlayer,
    },
    PlayerSwitch {
        id: PlayerId,
        name: String,
        server: String,
    },
    PlayerQuit {
        id: PlayerId,
        name: String,
    },
    /// Full player list of the origin proxy. Replaces whatever was known.
    Heartbeat {
        players: Vec<RemotePlayer>,
    },
    ProxyShutdown,
    PrivateMessage {
        from: String,
        to: String,
        message: String,
    },
    /// Pre-rendered text, optionally limited to holders of `permission`.
    Broadcast {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission: Option<String>,
    },
    StaffChat {
        from: String,
        server: Option<String>,
        message: String,
    },
    JoinMe {
        player: String,
        server: String,
    },
    /// Disconnects `player` wherever they are, showing `reason`.
    Disconnect {
        player: String,
        reason: String,
    },
    WhitelistToggle {
        enabled: bool,
        by: String,
    },
    MaintenanceToggle {
        enabled: bool,
        by: String,
    },
}

impl CrossProxyMessage {
    /// Tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CrossProxyMessage::PlayerJoin { .. } => "player_join",
            CrossProxyMessage::PlayerSwitch { .. } => "player_switch",
            CrossProxyMessage::PlayerQuit { .. } => "player_quit",
            CrossProxyMessage::Heartbeat { .. } => "heartbeat",
            CrossProxyMessage::ProxyShutdown => "proxy_shutdown",
            CrossProxyMessage::PrivateMessage { .. } => "private_message",
            CrossProxyMessage::Broadcast { .. } => "broadcast",
            CrossProxyMessage::StaffChat { .. } => "staff_chat",
            CrossProxyMessage::JoinMe { .. } => "join_me",
            CrossProxyMessage::Disconnect { .. } => "disconnect",
            CrossProxyMessage::WhitelistToggle { .. } => "whitelist_toggle",
            CrossProxyMessage::MaintenanceToggle { .. } => "maintenance_toggle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Id of the proxy that published the message.
    pub origin: String,
    /// Unix milliseconds at publish time.
    pub sent_at: i64,
    pub message: CrossProxyMessage,
}

impl Envelope {
    pub fn new(origin: impl Into<String>, sent_at: i64, message: CrossProxyMessage) -> Self {
        Self {
            origin: origin.into(),
            sent_at,
            message,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_internally_tagged() {
        let envelope = Envelope::new(
            "proxy-1",
            42,
            CrossProxyMessage::Disconnect {
                player: "Griefer".to_string(),
                reason: "Banned".to_string(),
            },
        );
        let json: serde_json::Value = serde_json::from_str(&envelope.encode().unwrap()).unwrap();
        assert_eq!(json["origin"], "proxy-1");
        assert_eq!(json["message"]["type"], "disconnect");
        assert_eq!(json["message"]["player"], "Griefer");
    }

    #[test]
    fn test_broadcast_permission_is_optional_on_the_wire() {
        let payload = r#"{"origin":"p2","sent_at":1,"message":{"type":"broadcast","message":"hi"}}"#;
        let envelope = Envelope::decode(payload).unwrap();
        assert_eq!(
            envelope.message,
            CrossProxyMessage::Broadcast {
                message: "hi".to_string(),
                permission: None
            }
        );
        assert!(!envelope.encode().unwrap().contains("permission"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let payload = r#"{"origin":"p2","sent_at":1,"message":{"type":"self_destruct"}}"#;
        assert!(Envelope::decode(payload).is_err());
    }
}
