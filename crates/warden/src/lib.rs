//! # Warden Node
//!
//! Headless Warden node: loads the configuration, connects the database and
//! the cross-proxy bus, registers the moderation plugin and accepts
//! commands on the console until it is stopped.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (creates config.toml if missing)
//! warden
//!
//! # Join a network of proxies
//! warden --proxy-id eu-1 --redis-url redis://127.0.0.1/
//!
//! # Production logging
//! warden --config /etc/warden/config.toml --json-logs
//! ```
//!
//! ## Signal Handling
//!
//! SIGINT/SIGTERM (or `stop` on the console) starts a graceful shutdown;
//! a second signal exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the node until it is shut down.
///
/// Startup failures are logged and exit the process with code 1. Must be
/// called from inside a tokio runtime.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging needs the config before the application validates it.
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    let mut logging = config.logging;
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{FileConfigSource, LoggingSettings, ProxySettings, RedisSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_for(dir: &TempDir) -> CliArgs {
        let path = dir.path().join("config.toml");
        let path = path.to_string_lossy().to_string();
        CliArgs::parse_from(["warden", "--config", path.as_str(), "--database-url", "sqlite::memory:"])
    }

    #[tokio::test]
    async fn test_application_starts_standalone() {
        let dir = TempDir::new().unwrap();
        let args = args_for(&dir);
        let config_path = args.config_path.clone();

        let app = Application::new(args).await.unwrap();
        assert!(config_path.exists());
        drop(app);
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_string_lossy().to_string();
        let args = CliArgs::parse_from([
            "warden",
            "--config",
            path.as_str(),
            "--database-url",
            "sqlite::memory:",
            "--log-level",
            "loud",
        ]);

        let err = Application::new(args).await.err().unwrap();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[tokio::test]
    async fn test_invalid_moderation_section_fails_startup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[chat_filter]\npatterns = [\"(unclosed\"]\n")
            .await
            .unwrap();
        let path = path.to_string_lossy().to_string();
        let args = CliArgs::parse_from(["warden", "-c", path.as_str(), "--database-url", "sqlite::memory:"]);

        let err = Application::new(args).await.err().unwrap();
        assert!(err.to_string().contains("chat_filter.patterns"));
    }
}
