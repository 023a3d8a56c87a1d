//! Logging system setup.
//!
//! Builds the tracing subscriber from `[logging]` with either human-readable
//! or JSON output.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. `json_format`
/// forces JSON output regardless of the file setting.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(fmt::layer()
                .json()
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(true)
                .with_thread_names(true)
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_target(false)
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the startup banner.
pub fn display_banner(proxy_id: &str) {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║              🛡️  WARDEN 🛡️                ║");
    info!("║      Network moderation node v{:<10} ║", version);
    info!("║                                          ║");
    info!("║  🔨 Bans, mutes, warnings, reports       ║");
    info!("║  💬 Chat filter and spam guard           ║");
    info!("║  🌐 Cross-proxy presence and messaging   ║");
    info!("║                                          ║");
    info!("╚══════════════════════════════════════════╝");
    info!("🏷️ Proxy id: {}", proxy_id);
}
