//! # Warden Storage
//!
//! SQL persistence for the moderation layer: a pooled [`DatabaseManager`]
//! plus one repository per table. Repositories take explicit `now`
//! timestamps (Unix milliseconds) so callers and tests control time.

pub mod database;
pub mod error;
pub mod player_stats;
pub mod punishments;
pub mod reports;
mod schema;
pub mod whitelist;

pub use database::{DatabaseManager, DatabaseSettings, Dialect};
pub use error::{StorageError, StorageResult};
pub use player_stats::{PlayerStats, PlayerStatsRepository};
pub use punishments::{NewPunishment, Punishment, PunishmentRepository, PunishmentType};
pub use reports::{NewReport, Report, ReportRepository, ReportStatus};
pub use whitelist::{WhitelistEntry, WhitelistRepository};

/// Case-folded lookup key for player names.
pub fn name_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests;
