//! Configuration management for the Warden node.
//!
//! One TOML file holds the node's own sections (`[proxy]`, `[database]`,
//! `[redis]`, `[logging]`) and, flattened next to them, every feature
//! section of [`ModerationConfig`]. A missing file is created with the
//! defaults.

use plugin_moderation::{ConfigSource, ModerationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use warden_storage::DatabaseSettings;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub proxy: ProxySettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub logging: LoggingSettings,
    #[serde(flatten)]
    pub moderation: ModerationConfig,
}

/// Identity of this proxy and the backends it routes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Unique id within the network, used as the cross-proxy origin
    pub id: String,
    /// Backend server names registered with the proxy
    pub servers: Vec<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            id: "proxy-1".to_string(),
            servers: vec!["lobby".to_string(), "survival".to_string()],
        }
    }
}

/// Cross-proxy bus. Without a URL the node runs standalone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub channel: String,
    /// Interval of presence heartbeats
    pub heartbeat_secs: u64,
    /// Presence of a proxy silent for this long is dropped
    pub stale_after_secs: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            channel: "warden:network".to_string(),
            heartbeat_secs: 10,
            stale_after_secs: 35,
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads the configuration, writing the defaults to `path` if the file
    /// does not exist yet.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Checks everything serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.proxy.id.trim().is_empty() {
            return Err("proxy.id cannot be empty".to_string());
        }
        if self.proxy.servers.is_empty() {
            return Err("proxy.servers must list at least one backend".to_string());
        }

        if self.database.url.trim().is_empty() {
            return Err("database.url cannot be empty".to_string());
        }
        if self.database.max_connections == 0 || self.database.min_connections > self.database.max_connections {
            return Err("database.min_connections must not exceed a non-zero database.max_connections".to_string());
        }

        if self.redis.channel.is_empty() {
            return Err("redis.channel cannot be empty".to_string());
        }
        if self.redis.heartbeat_secs == 0 {
            return Err("redis.heartbeat_secs must be greater than 0".to_string());
        }
        if self.redis.stale_after_secs <= self.redis.heartbeat_secs {
            return Err("redis.stale_after_secs must be longer than redis.heartbeat_secs".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        self.moderation.validate()
    }
}

/// Re-reads the feature sections from the config file for `/wardenreload`.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<ModerationConfig, String> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("cannot read {}: {e}", self.path.display()))?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| format!("cannot parse {}: {e}", self.path.display()))?;
        config.validate()?;
        Ok(config.moderation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.proxy.id, "proxy-1");
        assert!(config.redis.url.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));

        let mut config = AppConfig::default();
        config.redis.stale_after_secs = config.redis.heartbeat_secs;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.moderation.moderation.history_limit = 0;
        assert!(config.validate().unwrap_err().contains("history_limit"));
    }

    #[tokio::test]
    async fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.proxy.servers, vec!["lobby".to_string(), "survival".to_string()]);

        // The written file loads back to the same values.
        let again = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(again.proxy.id, config.proxy.id);
        assert_eq!(again.moderation.legal.documents, config.moderation.legal.documents);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("warden.toml");
        tokio::fs::write(
            &path,
            r#"
[proxy]
id = "eu-2"

[redis]
url = "redis://127.0.0.1/"

[whitelist]
enabled = true

[chat_filter]
enabled = true
words = ["noob"]

[messages]
prefix = "[N] "
whitelist-kick = "Invite only."
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.proxy.id, "eu-2");
        assert_eq!(config.proxy.servers.len(), 2);
        assert_eq!(config.redis.url.as_deref(), Some("redis://127.0.0.1/"));
        assert_eq!(config.redis.heartbeat_secs, 10);
        assert!(config.moderation.whitelist.enabled);
        assert_eq!(config.moderation.chat_filter.words, vec!["noob".to_string()]);
        assert_eq!(config.moderation.messages.prefix.as_deref(), Some("[N] "));
        assert_eq!(
            config.moderation.messages.templates.get("whitelist-kick").map(String::as_str),
            Some("Invite only.")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_source_reloads_feature_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[spam]\nmax_messages = 9\n").unwrap();

        let source = FileConfigSource::new(&path);
        assert_eq!(source.load().unwrap().spam.max_messages, 9);

        std::fs::write(&path, "[moderation]\nhistory_limit = 0\n").unwrap();
        assert!(source.load().is_err());

        std::fs::write(&path, "not toml [").unwrap();
        assert!(source.load().unwrap_err().contains("cannot parse"));
    }
}
