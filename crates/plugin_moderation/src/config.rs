//! # Moderation Configuration
//!
//! Feature sections of the Warden config file. The binary flattens
//! [`ModerationConfig`] into its own config so each section below is a
//! top-level TOML table (`[moderation]`, `[chat_filter]`, ...). Every field
//! has a default, so a partial file is always valid.

use crate::duration::parse_duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub moderation: ModerationSettings,
    pub chat_filter: ChatFilterSettings,
    pub spam: SpamSettings,
    pub whitelist: WhitelistSettings,
    pub maintenance: MaintenanceSettings,
    pub motd: MotdSettings,
    pub reports: ReportSettings,
    pub server_guard: ServerGuardSettings,
    pub legal: LegalSettings,
    pub messages: MessageSettings,
}

impl ModerationConfig {
    /// Checks values serde cannot: durations, regexes, limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.moderation.history_limit <= 0 {
            return Err("moderation.history_limit must be positive".to_string());
        }
        for rule in &self.moderation.warn_escalation {
            if rule.warns <= 0 {
                return Err("moderation.warn_escalation: warns must be positive".to_string());
            }
            if let Some(duration) = &rule.duration {
                parse_duration(duration)
                    .map_err(|e| format!("moderation.warn_escalation ({} warns): {}", rule.warns, e))?;
            }
        }
        for pattern in &self.chat_filter.patterns {
            regex::Regex::new(pattern).map_err(|e| format!("chat_filter.patterns: {}", e))?;
        }
        if self.spam.enabled && self.spam.max_messages == 0 {
            return Err("spam.max_messages must be at least 1".to_string());
        }
        if self.reports.max_open_per_reporter <= 0 {
            return Err("reports.max_open_per_reporter must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationSettings {
    /// Announce bans, mutes and kicks to every player.
    pub broadcast_punishments: bool,
    pub default_reason: String,
    /// Entries shown by `/history`.
    pub history_limit: i64,
    /// Commands a muted player may not run.
    pub muted_blocked_commands: Vec<String>,
    pub staff_chat_prefix: String,
    pub warn_escalation: Vec<EscalationRule>,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            broadcast_punishments: false,
            default_reason: "No reason given".to_string(),
            history_limit: 10,
            muted_blocked_commands: ["msg", "tell", "w", "r", "reply", "me"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            staff_chat_prefix: "#".to_string(),
            warn_escalation: Vec::new(),
        }
    }
}

/// Punishment issued automatically when a player reaches `warns` active
/// warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub warns: i64,
    pub action: EscalationAction,
    /// Duration string such as `1d`; permanent when absent.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationAction {
    Mute,
    Ban,
    Kick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Replace,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatFilterSettings {
    pub enabled: bool,
    pub mode: FilterMode,
    /// Matched against whole alphanumeric tokens, case-insensitively.
    pub words: Vec<String>,
    /// Regular expressions matched case-insensitively anywhere in a message.
    pub patterns: Vec<String>,
    pub replacement: String,
}

impl Default for ChatFilterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: FilterMode::Replace,
            words: Vec::new(),
            patterns: Vec::new(),
            replacement: "****".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamSettings {
    pub enabled: bool,
    pub window_ms: u64,
    pub max_messages: usize,
    pub cooldown_secs: u64,
}

impl Default for SpamSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 3_000,
            max_messages: 5,
            cooldown_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistSettings {
    /// Initial state; `/whitelist on|off` changes it at runtime.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    /// Initial state; `/maintenance` changes it at runtime.
    pub enabled: bool,
    pub motd: String,
    pub version_text: String,
    pub bypass_players: Vec<String>,
    /// Remaining seconds at which a scheduled maintenance is announced.
    pub countdown_marks: Vec<u64>,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            motd: "&cThe network is under maintenance.\n&7Please check back later.".to_string(),
            version_text: "&4Maintenance".to_string(),
            bypass_players: Vec::new(),
            countdown_marks: vec![300, 60, 30, 10, 5, 4, 3, 2, 1],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotdSettings {
    /// Up to two lines shown in the server list.
    pub lines: Vec<String>,
    /// Overrides the host's player limit when set.
    pub max_players: Option<u32>,
}

impl Default for MotdSettings {
    fn default() -> Self {
        Self {
            lines: vec!["&bA Warden network".to_string(), "&7Play fair.".to_string()],
            max_players: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub cooldown_secs: u64,
    pub max_open_per_reporter: i64,
    /// Entries shown by `/reports`.
    pub list_limit: i64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            max_open_per_reporter: 3,
            list_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerGuardSettings {
    /// Backend server name to the permission required to join it.
    pub rules: BTreeMap<String, String>,
    /// Fallback servers for `/lobby` and kicked players, in preference order.
    pub lobbies: Vec<String>,
}

impl Default for ServerGuardSettings {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
            lobbies: vec!["lobby".to_string()],
        }
    }
}

/// Named documents shown by `/legal <name>`, one entry per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalSettings {
    #[serde(flatten)]
    pub documents: BTreeMap<String, Vec<String>>,
}

impl Default for LegalSettings {
    fn default() -> Self {
        let mut documents = BTreeMap::new();
        documents.insert(
            "rules".to_string(),
            vec![
                "&61. &fBe respectful.".to_string(),
                "&62. &fNo cheats or unfair modifications.".to_string(),
                "&63. &fNo griefing or spam.".to_string(),
            ],
        );
        Self { documents }
    }
}

/// Overrides for message templates, keyed by template name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(flatten)]
    pub templates: BTreeMap<String, String>,
}
