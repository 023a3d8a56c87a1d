//! Termination signals.
//!
//! The first SIGINT/SIGTERM (Ctrl+C on Windows) starts the phased shutdown
//! in [`crate::app`]; a second one exits immediately.

use tokio::signal;
use tracing::info;

/// Resolves on the next termination signal.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        info!("📡 Received {}", name);
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}
