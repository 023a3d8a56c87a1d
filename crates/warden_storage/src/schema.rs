//! DDL for every Warden table.
//!
//! Columns are kept to types both dialects agree on: `VARCHAR` for text and
//! `BIGINT` for ids, timestamps (Unix millis) and 0/1 flags.

use crate::database::Dialect;

pub(crate) fn statements(dialect: Dialect, prefix: &str) -> Vec<String> {
    let id = match dialect {
        Dialect::MySql => "id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
        Dialect::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
    };

    let tables = [
        (
            "punishments",
            format!(
                "{id},
                player_name VARCHAR(16) NOT NULL,
                player_key VARCHAR(16) NOT NULL,
                player_uuid VARCHAR(36) NULL,
                punishment_type VARCHAR(8) NOT NULL,
                reason VARCHAR(255) NOT NULL,
                issuer VARCHAR(16) NOT NULL,
                start_time BIGINT NOT NULL,
                duration BIGINT NULL,
                end_time BIGINT NULL,
                active BIGINT NOT NULL DEFAULT 1,
                removed_by VARCHAR(16) NULL,
                removed_at BIGINT NULL,
                removed_reason VARCHAR(255) NULL"
            ),
            vec![("player", "player_key, punishment_type, active"), ("expiry", "active, end_time")],
        ),
        (
            "reports",
            format!(
                "{id},
                reporter VARCHAR(16) NOT NULL,
                reporter_key VARCHAR(16) NOT NULL,
                target VARCHAR(16) NOT NULL,
                target_key VARCHAR(16) NOT NULL,
                reason VARCHAR(255) NOT NULL,
                server VARCHAR(64) NULL,
                created_at BIGINT NOT NULL,
                status VARCHAR(8) NOT NULL,
                handled_by VARCHAR(16) NULL,
                handled_at BIGINT NULL,
                note VARCHAR(255) NULL"
            ),
            vec![("status", "status, created_at"), ("reporter", "reporter_key, created_at")],
        ),
        (
            "whitelist",
            "name_key VARCHAR(16) NOT NULL PRIMARY KEY,
                name VARCHAR(16) NOT NULL,
                added_by VARCHAR(16) NOT NULL,
                added_at BIGINT NOT NULL"
                .to_string(),
            vec![],
        ),
        (
            "player_stats",
            "player_uuid VARCHAR(36) NOT NULL PRIMARY KEY,
                last_name VARCHAR(16) NOT NULL,
                name_key VARCHAR(16) NOT NULL,
                first_join BIGINT NOT NULL,
                last_join BIGINT NOT NULL,
                join_count BIGINT NOT NULL DEFAULT 0,
                playtime_ms BIGINT NOT NULL DEFAULT 0,
                last_server VARCHAR(64) NULL"
                .to_string(),
            vec![("name", "name_key"), ("playtime", "playtime_ms")],
        ),
    ];

    let mut statements = Vec::new();
    for (table, columns, indices) in tables {
        let table = format!("{prefix}{table}");
        match dialect {
            // MySQL has no CREATE INDEX IF NOT EXISTS, so indices go inline.
            Dialect::MySql => {
                let inline: String = indices
                    .iter()
                    .map(|(name, cols)| format!(",\n                INDEX idx_{table}_{name} ({cols})"))
                    .collect();
                statements.push(format!(
                    "CREATE TABLE IF NOT EXISTS {table} (\n                {columns}{inline}\n            ) DEFAULT CHARSET=utf8mb4"
                ));
            }
            Dialect::Sqlite => {
                statements.push(format!("CREATE TABLE IF NOT EXISTS {table} (\n                {columns}\n            )"));
                for (name, cols) in indices {
                    statements.push(format!(
                        "CREATE INDEX IF NOT EXISTS idx_{table}_{name} ON {table} ({cols})"
                    ));
                }
            }
        }
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_applied_to_every_table() {
        let sql = statements(Dialect::Sqlite, "net1_");
        assert!(sql.iter().any(|s| s.contains("CREATE TABLE IF NOT EXISTS net1_punishments")));
        assert!(sql.iter().any(|s| s.contains("ON net1_reports")));
        assert!(sql.iter().all(|s| !s.contains("warden_")));
    }

    #[test]
    fn test_mysql_uses_inline_indices() {
        let sql = statements(Dialect::MySql, "warden_");
        assert_eq!(sql.len(), 4);
        assert!(sql[0].contains("AUTO_INCREMENT"));
        assert!(sql[0].contains("INDEX idx_warden_punishments_player"));
        assert!(sql.iter().all(|s| !s.starts_with("CREATE INDEX")));
    }
}
