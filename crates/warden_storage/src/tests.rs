use crate::*;

const HOUR: i64 = 3_600_000;

async fn memory_db() -> DatabaseManager {
    DatabaseManager::connect(&DatabaseSettings::in_memory())
        .await
        .expect("in-memory database")
}

fn punishment(name: &str, kind: PunishmentType, start: i64, duration: Option<i64>) -> NewPunishment {
    NewPunishment {
        player_name: name.to_string(),
        player_uuid: None,
        kind,
        reason: "testing".to_string(),
        issuer: "CONSOLE".to_string(),
        start_time: start,
        duration,
    }
}

#[tokio::test]
async fn test_temporary_ban_expires_lazily() {
    let repo = PunishmentRepository::new(memory_db().await);
    let start = 1_000_000;
    let id = repo
        .insert(&punishment("Griefer", PunishmentType::Ban, start, Some(HOUR)))
        .await
        .unwrap();

    assert!(repo.is_active("griefer", PunishmentType::Ban, start + HOUR - 1).await.unwrap());

    // Reaching end_time flips the record, and it never comes back.
    assert!(!repo.is_active("GRIEFER", PunishmentType::Ban, start + HOUR).await.unwrap());
    assert!(!repo.is_active("griefer", PunishmentType::Ban, start).await.unwrap());

    let stored = repo.get(id, start + HOUR).await.unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.end_time, Some(start + HOUR));
    assert_eq!(stored.removed_by, None);
}

#[tokio::test]
async fn test_permanent_punishment_has_no_end() {
    let repo = PunishmentRepository::new(memory_db().await);
    repo.insert(&punishment("Steve", PunishmentType::Mute, 10, None)).await.unwrap();

    let active = repo
        .find_active("steve", PunishmentType::Mute, i64::MAX / 2)
        .await
        .unwrap()
        .expect("permanent mute stays active");
    assert!(active.is_permanent());
    assert_eq!(active.duration, None);
    assert_eq!(active.remaining_ms(100), None);
}

#[tokio::test]
async fn test_kick_is_history_only() {
    let repo = PunishmentRepository::new(memory_db().await);
    repo.insert(&punishment("Alex", PunishmentType::Kick, 5, None)).await.unwrap();

    assert!(!repo.is_active("alex", PunishmentType::Kick, 6).await.unwrap());
    let history = repo.history("alex", 10, 6).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, PunishmentType::Kick);
    assert!(!history[0].active);
}

#[tokio::test]
async fn test_deactivate_records_removal() {
    let repo = PunishmentRepository::new(memory_db().await);
    let id = repo.insert(&punishment("Notch", PunishmentType::Ban, 0, None)).await.unwrap();

    let lifted = repo
        .deactivate("notch", PunishmentType::Ban, "Admin", Some("appeal accepted"), 50)
        .await
        .unwrap();
    assert_eq!(lifted, 1);

    let stored = repo.get(id, 60).await.unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.removed_by.as_deref(), Some("Admin"));
    assert_eq!(stored.removed_at, Some(50));
    assert_eq!(stored.removed_reason.as_deref(), Some("appeal accepted"));

    // Nothing left to lift.
    assert_eq!(
        repo.deactivate("notch", PunishmentType::Ban, "Admin", None, 70).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_history_newest_first_and_warn_count() {
    let repo = PunishmentRepository::new(memory_db().await);
    for start in [100, 200, 300] {
        repo.insert(&punishment("Jeb_", PunishmentType::Warn, start, None)).await.unwrap();
    }
    repo.insert(&punishment("Other", PunishmentType::Warn, 400, None)).await.unwrap();

    assert_eq!(repo.count_active("jeb_", PunishmentType::Warn, 500).await.unwrap(), 3);

    let history = repo.history("jeb_", 2, 500).await.unwrap();
    let starts: Vec<i64> = history.iter().map(|p| p.start_time).collect();
    assert_eq!(starts, vec![300, 200]);
}

#[tokio::test]
async fn test_reports_open_and_close() {
    let repo = ReportRepository::new(memory_db().await);
    let first = repo
        .insert(&NewReport {
            reporter: "Alice".to_string(),
            target: "Mallory".to_string(),
            reason: "x-ray".to_string(),
            server: Some("survival".to_string()),
            created_at: 10,
        })
        .await
        .unwrap();
    repo.insert(&NewReport {
        reporter: "Bob".to_string(),
        target: "mallory".to_string(),
        reason: "fly".to_string(),
        server: None,
        created_at: 20,
    })
    .await
    .unwrap();

    assert_eq!(repo.count_open().await.unwrap(), 2);
    assert_eq!(repo.count_open_by_reporter("ALICE").await.unwrap(), 1);
    assert_eq!(repo.last_report_at("bob").await.unwrap(), Some(20));
    assert_eq!(repo.last_report_at("carol").await.unwrap(), None);
    assert_eq!(repo.for_target("MALLORY", 10).await.unwrap().len(), 2);

    assert!(repo.close(first, "Mod", Some("banned"), 30).await.unwrap());
    assert!(!repo.close(first, "Mod", None, 40).await.unwrap());
    assert!(!repo.close(999, "Mod", None, 40).await.unwrap());

    let closed = repo.get(first).await.unwrap().unwrap();
    assert_eq!(closed.status, ReportStatus::Closed);
    assert_eq!(closed.handled_by.as_deref(), Some("Mod"));
    assert_eq!(closed.note.as_deref(), Some("banned"));

    let open = repo.open(10).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].reporter, "Bob");
}

#[tokio::test]
async fn test_whitelist_is_case_insensitive() {
    let repo = WhitelistRepository::new(memory_db().await);
    assert!(repo.add("Notch", "CONSOLE", 1).await.unwrap());
    assert!(!repo.add("NOTCH", "CONSOLE", 2).await.unwrap());
    assert!(repo.contains("notch").await.unwrap());
    repo.add("alex", "Admin", 3).await.unwrap();

    let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["alex".to_string(), "Notch".to_string()]);

    assert!(repo.remove("nOtCh").await.unwrap());
    assert!(!repo.remove("notch").await.unwrap());
    assert!(!repo.contains("Notch").await.unwrap());
}

#[tokio::test]
async fn test_player_stats_accumulate() {
    let repo = PlayerStatsRepository::new(memory_db().await);
    let uuid = "8667ba71-b85a-4004-af54-457a9734eed7";

    repo.record_join(uuid, "Steve", 1_000).await.unwrap();
    repo.add_playtime(uuid, 5_000).await.unwrap();
    repo.record_join(uuid, "Steve2", 9_000).await.unwrap();
    repo.record_server(uuid, "survival").await.unwrap();
    repo.add_playtime(uuid, 1_000).await.unwrap();

    let stats = repo.find_by_name("steve2").await.unwrap().unwrap();
    assert_eq!(stats.first_join, 1_000);
    assert_eq!(stats.last_join, 9_000);
    assert_eq!(stats.join_count, 2);
    assert_eq!(stats.playtime_ms, 6_000);
    assert_eq!(stats.last_server.as_deref(), Some("survival"));
    assert!(repo.find_by_name("steve").await.unwrap().is_none());

    repo.record_join("other", "Alex", 2_000).await.unwrap();
    let top = repo.top_playtime(5).await.unwrap();
    assert_eq!(top[0].player_uuid, uuid);
    assert_eq!(top.len(), 2);
}

#[tokio::test]
async fn test_table_prefix_isolates_schemas() {
    let settings = DatabaseSettings {
        table_prefix: "net2_".to_string(),
        ..DatabaseSettings::in_memory()
    };
    let db = DatabaseManager::connect(&settings).await.unwrap();
    let repo = WhitelistRepository::new(db.clone());
    repo.add("Notch", "CONSOLE", 1).await.unwrap();

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM net2_whitelist")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

#[tokio::test]
async fn test_rejects_bad_prefix() {
    let settings = DatabaseSettings {
        table_prefix: "x; DROP".to_string(),
        ..DatabaseSettings::in_memory()
    };
    assert!(matches!(
        DatabaseManager::connect(&settings).await,
        Err(StorageError::InvalidTablePrefix(_))
    ));
}

#[tokio::test]
async fn test_inserts_return_sequential_ids() {
    let db = memory_db().await;
    let punishments = PunishmentRepository::new(db.clone());
    let first = punishments
        .insert(&punishment("Alex", PunishmentType::Warn, 1, None))
        .await
        .unwrap();
    let second = punishments
        .insert(&punishment("Alex", PunishmentType::Warn, 2, None))
        .await
        .unwrap();
    assert_eq!(second, first + 1);
    assert_eq!(punishments.get(second, 3).await.unwrap().unwrap().start_time, 2);

    let reports = ReportRepository::new(db);
    let report = NewReport {
        reporter: "Steve".to_string(),
        target: "Alex".to_string(),
        reason: "fly hacks".to_string(),
        server: None,
        created_at: 10,
    };
    let id = reports.insert(&report).await.unwrap();
    assert!(id > 0);
    assert_eq!(reports.get(id).await.unwrap().unwrap().target, "Alex");
}

#[tokio::test]
async fn test_huge_duration_saturates_end_time() {
    let repo = PunishmentRepository::new(memory_db().await);
    let start = 1_700_000_000_000;
    let id = repo
        .insert(&punishment("Griefer", PunishmentType::Ban, start, Some(i64::MAX)))
        .await
        .unwrap();

    let stored = repo.get(id, start + 1).await.unwrap().unwrap();
    assert_eq!(stored.end_time, Some(i64::MAX));
    assert!(repo.is_active("griefer", PunishmentType::Ban, start + HOUR).await.unwrap());
}
