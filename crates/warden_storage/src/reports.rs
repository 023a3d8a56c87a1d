//! Player reports.

use crate::database::DatabaseManager;
use crate::error::{StorageError, StorageResult};
use crate::name_key;
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Closed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Open => "open",
            ReportStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub reporter: String,
    pub target: String,
    pub reason: String,
    pub server: Option<String>,
    pub created_at: i64,
    pub status: ReportStatus,
    pub handled_by: Option<String>,
    pub handled_at: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub reporter: String,
    pub target: String,
    pub reason: String,
    pub server: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseManager,
    table: String,
}

const COLUMNS: &str =
    "id, reporter, target, reason, server, created_at, status, handled_by, handled_at, note";

impl ReportRepository {
    pub fn new(db: DatabaseManager) -> Self {
        let table = db.table("reports");
        Self { db, table }
    }

    pub async fn insert(&self, new: &NewReport) -> StorageResult<i64> {
        let sql = self.db.returning_id(format!(
            "INSERT INTO {} (reporter, reporter_key, target, target_key, reason, server, created_at, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        ));
        let query = sqlx::query(&sql)
            .bind(new.reporter.as_str())
            .bind(name_key(&new.reporter))
            .bind(new.target.as_str())
            .bind(name_key(&new.target))
            .bind(new.reason.as_str())
            .bind(new.server.clone())
            .bind(new.created_at)
            .bind(ReportStatus::Open.as_str());

        self.db.insert_id(query).await
    }

    pub async fn get(&self, id: i64) -> StorageResult<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM {} WHERE id = ?", self.table))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// Open reports, oldest first.
    pub async fn open(&self, limit: i64) -> StorageResult<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE status = ? ORDER BY created_at ASC, id ASC LIMIT ?",
            self.table
        ))
        .bind(ReportStatus::Open.as_str())
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(from_row).collect()
    }

    /// Every report filed against a player, newest first.
    pub async fn for_target(&self, target: &str, limit: i64) -> StorageResult<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE target_key = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            self.table
        ))
        .bind(name_key(target))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(from_row).collect()
    }

    /// Closes an open report. Returns `false` if it does not exist or was
    /// already closed.
    pub async fn close(&self, id: i64, handled_by: &str, note: Option<&str>, now: i64) -> StorageResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET status = ?, handled_by = ?, handled_at = ?, note = ? WHERE id = ? AND status = ?",
            self.table
        ))
        .bind(ReportStatus::Closed.as_str())
        .bind(handled_by)
        .bind(now)
        .bind(note.map(str::to_string))
        .bind(id)
        .bind(ReportStatus::Open.as_str())
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn count_open(&self) -> StorageResult<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM {} WHERE status = ?", self.table))
            .bind(ReportStatus::Open.as_str())
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.try_get::<i64, _>("total")?)
    }

    pub async fn count_open_by_reporter(&self, reporter: &str) -> StorageResult<i64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM {} WHERE reporter_key = ? AND status = ?",
            self.table
        ))
        .bind(name_key(reporter))
        .bind(ReportStatus::Open.as_str())
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.try_get::<i64, _>("total")?)
    }

    /// Creation time of the reporter's most recent report.
    pub async fn last_report_at(&self, reporter: &str) -> StorageResult<Option<i64>> {
        let row = sqlx::query(&format!(
            "SELECT created_at FROM {} WHERE reporter_key = ? ORDER BY created_at DESC LIMIT 1",
            self.table
        ))
        .bind(name_key(reporter))
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(|row| row.try_get::<i64, _>("created_at")).transpose()?)
    }
}

fn from_row(row: &AnyRow) -> StorageResult<Report> {
    let status: String = row.try_get("status")?;
    let status = match status.as_str() {
        "open" => ReportStatus::Open,
        "closed" => ReportStatus::Closed,
        other => {
            return Err(StorageError::InvalidRecord {
                table: "reports",
                message: format!("unknown status '{other}'"),
            })
        }
    };

    Ok(Report {
        id: row.try_get("id")?,
        reporter: row.try_get("reporter")?,
        target: row.try_get("target")?,
        reason: row.try_get("reason")?,
        server: row.try_get("server")?,
        created_at: row.try_get("created_at")?,
        status,
        handled_by: row.try_get("handled_by")?,
        handled_at: row.try_get("handled_at")?,
        note: row.try_get("note")?,
    })
}
