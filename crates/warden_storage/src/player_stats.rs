//! Per-player join and playtime statistics, keyed by UUID.

use crate::database::DatabaseManager;
use crate::error::StorageResult;
use crate::name_key;
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_uuid: String,
    pub last_name: String,
    pub first_join: i64,
    pub last_join: i64,
    pub join_count: i64,
    pub playtime_ms: i64,
    pub last_server: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlayerStatsRepository {
    db: DatabaseManager,
    table: String,
}

const COLUMNS: &str = "player_uuid, last_name, first_join, last_join, join_count, playtime_ms, last_server";

impl PlayerStatsRepository {
    pub fn new(db: DatabaseManager) -> Self {
        let table = db.table("player_stats");
        Self { db, table }
    }

    /// Counts a join. The first join time is kept once set.
    pub async fn record_join(&self, uuid: &str, name: &str, now: i64) -> StorageResult<()> {
        let updated = sqlx::query(&format!(
            "UPDATE {} SET last_name = ?, name_key = ?, last_join = ?, join_count = join_count + 1 \
             WHERE player_uuid = ?",
            self.table
        ))
        .bind(name)
        .bind(name_key(name))
        .bind(now)
        .bind(uuid)
        .execute(self.db.pool())
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} (player_uuid, last_name, name_key, first_join, last_join, join_count, playtime_ms) \
                 VALUES (?, ?, ?, ?, ?, 1, 0)",
                self.table
            ))
            .bind(uuid)
            .bind(name)
            .bind(name_key(name))
            .bind(now)
            .bind(now)
            .execute(self.db.pool())
            .await?;
        }
        Ok(())
    }

    /// Adds a finished session to the player's playtime.
    pub async fn add_playtime(&self, uuid: &str, session_ms: i64) -> StorageResult<()> {
        sqlx::query(&format!(
            "UPDATE {} SET playtime_ms = playtime_ms + ? WHERE player_uuid = ?",
            self.table
        ))
        .bind(session_ms.max(0))
        .bind(uuid)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn record_server(&self, uuid: &str, server: &str) -> StorageResult<()> {
        sqlx::query(&format!("UPDATE {} SET last_server = ? WHERE player_uuid = ?", self.table))
            .bind(server)
            .bind(uuid)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> StorageResult<Option<PlayerStats>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM {} WHERE player_uuid = ?", self.table))
            .bind(uuid)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// Looks up the most recently seen player using `name`.
    pub async fn find_by_name(&self, name: &str) -> StorageResult<Option<PlayerStats>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE name_key = ? ORDER BY last_join DESC LIMIT 1",
            self.table
        ))
        .bind(name_key(name))
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(from_row).transpose()
    }

    pub async fn top_playtime(&self, limit: i64) -> StorageResult<Vec<PlayerStats>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} ORDER BY playtime_ms DESC, last_name ASC LIMIT ?",
            self.table
        ))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(from_row).collect()
    }
}

fn from_row(row: &AnyRow) -> StorageResult<PlayerStats> {
    Ok(PlayerStats {
        player_uuid: row.try_get("player_uuid")?,
        last_name: row.try_get("last_name")?,
        first_join: row.try_get("first_join")?,
        last_join: row.try_get("last_join")?,
        join_count: row.try_get("join_count")?,
        playtime_ms: row.try_get("playtime_ms")?,
        last_server: row.try_get("last_server")?,
    })
}
