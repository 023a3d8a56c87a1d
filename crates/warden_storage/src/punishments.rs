//! # Punishment Records
//!
//! Bans, mutes, warns and kicks share one table. A record moves from
//! active to inactive exactly once, either through an explicit removal or
//! through lazy expiry: every read first runs [`PunishmentRepository::expire_old`]
//! so a timed punishment is never observed active past its end time.

use crate::database::DatabaseManager;
use crate::error::{StorageError, StorageResult};
use crate::name_key;
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunishmentType {
    Ban,
    Mute,
    Warn,
    Kick,
}

impl PunishmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunishmentType::Ban => "ban",
            PunishmentType::Mute => "mute",
            PunishmentType::Warn => "warn",
            PunishmentType::Kick => "kick",
        }
    }

    /// Kicks are history-only and are stored inactive.
    pub fn starts_active(&self) -> bool {
        !matches!(self, PunishmentType::Kick)
    }
}

impl fmt::Display for PunishmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PunishmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ban" => Ok(PunishmentType::Ban),
            "mute" => Ok(PunishmentType::Mute),
            "warn" => Ok(PunishmentType::Warn),
            "kick" => Ok(PunishmentType::Kick),
            other => Err(format!("unknown punishment type '{other}'")),
        }
    }
}

/// A stored punishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Punishment {
    pub id: i64,
    pub player_name: String,
    pub player_uuid: Option<String>,
    pub kind: PunishmentType,
    pub reason: String,
    pub issuer: String,
    pub start_time: i64,
    /// `None` for permanent punishments.
    pub duration: Option<i64>,
    pub end_time: Option<i64>,
    pub active: bool,
    pub removed_by: Option<String>,
    pub removed_at: Option<i64>,
    pub removed_reason: Option<String>,
}

impl Punishment {
    pub fn is_permanent(&self) -> bool {
        self.end_time.is_none()
    }

    /// Milliseconds left at `now`, `None` when permanent.
    pub fn remaining_ms(&self, now: i64) -> Option<i64> {
        self.end_time.map(|end| (end - now).max(0))
    }
}

/// Input for [`PunishmentRepository::insert`].
#[derive(Debug, Clone)]
pub struct NewPunishment {
    pub player_name: String,
    pub player_uuid: Option<String>,
    pub kind: PunishmentType,
    pub reason: String,
    pub issuer: String,
    pub start_time: i64,
    pub duration: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PunishmentRepository {
    db: DatabaseManager,
    table: String,
}

const COLUMNS: &str = "id, player_name, player_uuid, punishment_type, reason, issuer, start_time, \
                       duration, end_time, active, removed_by, removed_at, removed_reason";

impl PunishmentRepository {
    pub fn new(db: DatabaseManager) -> Self {
        let table = db.table("punishments");
        Self { db, table }
    }

    /// Stores a new record and returns its id.
    pub async fn insert(&self, new: &NewPunishment) -> StorageResult<i64> {
        let end_time = new.duration.map(|duration| new.start_time.saturating_add(duration));
        let active: i64 = if new.kind.starts_active() { 1 } else { 0 };

        let sql = self.db.returning_id(format!(
            "INSERT INTO {} (player_name, player_key, player_uuid, punishment_type, reason, issuer, \
             start_time, duration, end_time, active) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        ));
        let query = sqlx::query(&sql)
            .bind(new.player_name.as_str())
            .bind(name_key(&new.player_name))
            .bind(new.player_uuid.clone())
            .bind(new.kind.as_str())
            .bind(new.reason.as_str())
            .bind(new.issuer.as_str())
            .bind(new.start_time)
            .bind(new.duration)
            .bind(end_time)
            .bind(active);

        let id = self.db.insert_id(query).await?;
        debug!("Stored {} #{} for {}", new.kind, id, new.player_name);
        Ok(id)
    }

    /// Deactivates every timed punishment whose end time has passed.
    pub async fn expire_old(&self, now: i64) -> StorageResult<u64> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET active = 0 WHERE active = 1 AND end_time IS NOT NULL AND end_time <= ?",
            self.table
        ))
        .bind(now)
        .execute(self.db.pool())
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            debug!("Expired {} punishments", expired);
        }
        Ok(expired)
    }

    /// The newest active punishment of `kind` for a player.
    pub async fn find_active(
        &self,
        player: &str,
        kind: PunishmentType,
        now: i64,
    ) -> StorageResult<Option<Punishment>> {
        self.expire_old(now).await?;
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE player_key = ? AND punishment_type = ? AND active = 1 \
             ORDER BY start_time DESC, id DESC LIMIT 1",
            self.table
        ))
        .bind(name_key(player))
        .bind(kind.as_str())
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(from_row).transpose()
    }

    pub async fn is_active(&self, player: &str, kind: PunishmentType, now: i64) -> StorageResult<bool> {
        Ok(self.count_active(player, kind, now).await? > 0)
    }

    pub async fn count_active(&self, player: &str, kind: PunishmentType, now: i64) -> StorageResult<i64> {
        self.expire_old(now).await?;
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM {} WHERE player_key = ? AND punishment_type = ? AND active = 1",
            self.table
        ))
        .bind(name_key(player))
        .bind(kind.as_str())
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.try_get::<i64, _>("total")?)
    }

    /// Deactivates every active punishment of `kind` for a player and
    /// returns how many were lifted.
    pub async fn deactivate(
        &self,
        player: &str,
        kind: PunishmentType,
        removed_by: &str,
        removed_reason: Option<&str>,
        now: i64,
    ) -> StorageResult<u64> {
        self.expire_old(now).await?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET active = 0, removed_by = ?, removed_at = ?, removed_reason = ? \
             WHERE player_key = ? AND punishment_type = ? AND active = 1",
            self.table
        ))
        .bind(removed_by)
        .bind(now)
        .bind(removed_reason.map(str::to_string))
        .bind(name_key(player))
        .bind(kind.as_str())
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// A player's punishments, newest first.
    pub async fn history(&self, player: &str, limit: i64, now: i64) -> StorageResult<Vec<Punishment>> {
        self.expire_old(now).await?;
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE player_key = ? ORDER BY start_time DESC, id DESC LIMIT ?",
            self.table
        ))
        .bind(name_key(player))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(from_row).collect()
    }

    pub async fn get(&self, id: i64, now: i64) -> StorageResult<Option<Punishment>> {
        self.expire_old(now).await?;
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM {} WHERE id = ?", self.table))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(from_row).transpose()
    }
}

fn from_row(row: &AnyRow) -> StorageResult<Punishment> {
    let kind: String = row.try_get("punishment_type")?;
    let kind = kind.parse().map_err(|message| StorageError::InvalidRecord {
        table: "punishments",
        message,
    })?;

    Ok(Punishment {
        id: row.try_get("id")?,
        player_name: row.try_get("player_name")?,
        player_uuid: row.try_get("player_uuid")?,
        kind,
        reason: row.try_get("reason")?,
        issuer: row.try_get("issuer")?,
        start_time: row.try_get("start_time")?,
        duration: row.try_get("duration")?,
        end_time: row.try_get("end_time")?,
        active: row.try_get::<i64, _>("active")? != 0,
        removed_by: row.try_get("removed_by")?,
        removed_at: row.try_get("removed_at")?,
        removed_reason: row.try_get("removed_reason")?,
    })
}
