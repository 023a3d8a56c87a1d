//! Whitelisted player names. Lookups are case-insensitive.

use crate::database::DatabaseManager;
use crate::error::StorageResult;
use crate::name_key;
use serde::{Deserialize, Serialize};
use sqlx::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub name: String,
    pub added_by: String,
    pub added_at: i64,
}

#[derive(Debug, Clone)]
pub struct WhitelistRepository {
    db: DatabaseManager,
    table: String,
}

impl WhitelistRepository {
    pub fn new(db: DatabaseManager) -> Self {
        let table = db.table("whitelist");
        Self { db, table }
    }

    /// Adds a name. Returns `false` if it was already listed.
    pub async fn add(&self, name: &str, added_by: &str, now: i64) -> StorageResult<bool> {
        if self.contains(name).await? {
            return Ok(false);
        }
        sqlx::query(&format!(
            "INSERT INTO {} (name_key, name, added_by, added_at) VALUES (?, ?, ?, ?)",
            self.table
        ))
        .bind(name_key(name))
        .bind(name)
        .bind(added_by)
        .bind(now)
        .execute(self.db.pool())
        .await?;
        Ok(true)
    }

    /// Removes a name. Returns `false` if it was not listed.
    pub async fn remove(&self, name: &str) -> StorageResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE name_key = ?", self.table))
            .bind(name_key(name))
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn contains(&self, name: &str) -> StorageResult<bool> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM {} WHERE name_key = ?", self.table))
            .bind(name_key(name))
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.try_get::<i64, _>("total")? > 0)
    }

    /// Every entry, alphabetically.
    pub async fn list(&self) -> StorageResult<Vec<WhitelistEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT name, added_by, added_at FROM {} ORDER BY name_key ASC",
            self.table
        ))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> StorageResult<WhitelistEntry> {
                Ok(WhitelistEntry {
                    name: row.try_get("name")?,
                    added_by: row.try_get("added_by")?,
                    added_at: row.try_get("added_at")?,
                })
            })
            .collect()
    }
}
