//! Integration tests for oneiro storage, stats, and backup
//!
//! These tests run against a real database file in a temp directory to
//! verify the end-to-end flow: record lifecycle, statistics over stored
//! data, and the export/import round trip.

use chrono::NaiveDate;
use oneiro_core::backup::{export_backup, import_backup};
use oneiro_core::db::Database;
use oneiro_core::stats;
use oneiro_core::types::{DreamFilter, DreamPatch, NewDream};
use oneiro_core::Backup;
use tempfile::TempDir;

/// Open a migrated database in a temp directory with one journal.
fn test_db() -> (TempDir, Database, i64) {
    let temp_dir = TempDir::new().expect("temp dir should be created");
    let db_path = temp_dir.path().join("journal.db");
    let db = Database::open(&db_path).expect("database should open");
    db.migrate().expect("migrations should run");
    let journal = db
        .ensure_journal("default")
        .expect("journal should be created");
    (temp_dir, db, journal.id)
}

fn dream(body: &str, mood: Option<&str>, lucidity: Option<i64>, date: &str) -> NewDream {
    NewDream {
        body: body.to_string(),
        mood: mood.map(|m| m.to_string()),
        lucidity,
        dream_date: Some(date.to_string()),
        ..Default::default()
    }
}

// ============================================
// Record Lifecycle
// ============================================

#[test]
fn test_record_lifecycle() {
    let (_guard, db, journal_id) = test_db();

    // Create
    let created = db
        .insert_dream(
            journal_id,
            &NewDream {
                title: Some("Harbor".to_string()),
                body: "flying over the harbor".to_string(),
                mood: Some("calm".to_string()),
                lucidity: Some(7),
                tags: vec!["flying".to_string(), "water".to_string()],
                dream_date: Some("2025-03-14".to_string()),
                ..Default::default()
            },
        )
        .expect("insert should succeed");
    assert!(created.id > 0);

    // Read back
    let fetched = db
        .get_dream(journal_id, created.id)
        .expect("get should succeed")
        .expect("record should exist");
    assert_eq!(fetched.body, "flying over the harbor");
    assert_eq!(fetched.tags, vec!["flying", "water"]);

    // Partial update: change mood, clear the date, leave the rest alone
    let updated = db
        .update_dream(
            journal_id,
            created.id,
            &DreamPatch {
                mood: Some(Some("uneasy".to_string())),
                dream_date: Some(None),
                ..Default::default()
            },
        )
        .expect("update should succeed")
        .expect("record should exist");
    assert_eq!(updated.mood.as_deref(), Some("uneasy"));
    assert_eq!(updated.dream_date, None);
    assert_eq!(updated.body, "flying over the harbor");
    assert!(updated.updated_at >= created.updated_at);

    // Delete
    assert!(db
        .delete_dream(journal_id, created.id)
        .expect("delete should succeed"));
    assert!(db
        .get_dream(journal_id, created.id)
        .expect("get should succeed")
        .is_none());
    assert!(!db
        .delete_dream(journal_id, created.id)
        .expect("second delete should succeed"));
}

#[test]
fn test_listing_with_filters() {
    let (_guard, db, journal_id) = test_db();

    db.insert_dream(
        journal_id,
        &dream("chased through a maze", Some("anxious"), None, "2025-03-10"),
    )
    .expect("insert should succeed");
    db.insert_dream(
        journal_id,
        &dream("quiet beach at dusk", Some("calm"), None, "2025-03-11"),
    )
    .expect("insert should succeed");
    db.insert_dream(
        journal_id,
        &NewDream {
            body: "maze again, found the exit".to_string(),
            mood: Some("calm".to_string()),
            tags: vec!["maze".to_string()],
            dream_date: Some("2025-03-12".to_string()),
            ..Default::default()
        },
    )
    .expect("insert should succeed");

    let all = db
        .list_dreams(journal_id, &DreamFilter::default())
        .expect("list should succeed");
    assert_eq!(all.len(), 3);

    let mazes = db
        .list_dreams(
            journal_id,
            &DreamFilter {
                search: Some("maze".to_string()),
                ..Default::default()
            },
        )
        .expect("list should succeed");
    assert_eq!(mazes.len(), 2);

    let calm_mazes = db
        .list_dreams(
            journal_id,
            &DreamFilter {
                search: Some("maze".to_string()),
                mood: Some("calm".to_string()),
                ..Default::default()
            },
        )
        .expect("list should succeed");
    assert_eq!(calm_mazes.len(), 1);
    assert_eq!(calm_mazes[0].body, "maze again, found the exit");

    let tagged = db
        .list_dreams(
            journal_id,
            &DreamFilter {
                tag: Some("maze".to_string()),
                ..Default::default()
            },
        )
        .expect("list should succeed");
    assert_eq!(tagged.len(), 1);
}

// ============================================
// Stats Over Stored Data
// ============================================

#[test]
fn test_stats_from_storage() {
    let (_guard, db, journal_id) = test_db();
    let today = NaiveDate::from_ymd_opt(2025, 8, 25).expect("valid date");

    db.insert_dream(journal_id, &dream("one", Some("calm"), Some(6), "2025-08-25"))
        .expect("insert should succeed");
    db.insert_dream(journal_id, &dream("two", Some("calm"), Some(7), "2025-08-24"))
        .expect("insert should succeed");
    db.insert_dream(journal_id, &dream("three", Some("tense"), None, "2025-08-23"))
        .expect("insert should succeed");
    // Old record: outside the monthly window, still in totals and weekdays
    db.insert_dream(journal_id, &dream("old", None, Some(2), "2023-01-05"))
        .expect("insert should succeed");

    let summary = stats::generate_summary(&db, journal_id).expect("summary should compute");
    assert_eq!(summary.total, 4);
    assert_eq!(summary.mood_counts.get("calm"), Some(&2));
    assert_eq!(summary.mood_counts.get("tense"), Some(&1));
    // (6+7+2)/3 = 5.0
    assert_eq!(summary.average_lucidity, Some(5.0));

    let detailed =
        stats::generate_detailed(&db, journal_id, today).expect("detailed should compute");
    assert_eq!(detailed.total_dreams, 4);
    assert_eq!(detailed.current_streak, 3);
    assert_eq!(detailed.dreams_by_month.len(), 1);
    assert_eq!(detailed.dreams_by_month[0].month, "2025-08");
    assert_eq!(detailed.dreams_by_month[0].count, 3);
    assert_eq!(detailed.mood_distribution[0].mood, "calm");

    let weekday_total: i64 = detailed.dreams_by_day.iter().map(|b| b.count).sum();
    assert_eq!(weekday_total, 4, "every dated record lands in a weekday");
}

#[test]
fn test_stats_survive_defective_dates() {
    let (_guard, db, journal_id) = test_db();
    let today = NaiveDate::from_ymd_opt(2025, 8, 25).expect("valid date");

    db.insert_dream(journal_id, &dream("good", Some("calm"), Some(5), "2025-08-25"))
        .expect("insert should succeed");
    db.insert_dream(
        journal_id,
        &dream("bad date", Some("calm"), Some(9), "someday soon"),
    )
    .expect("insert should succeed");

    let detailed =
        stats::generate_detailed(&db, journal_id, today).expect("detailed should compute");
    // Defective record is counted, but only the parsable one is bucketed
    assert_eq!(detailed.total_dreams, 2);
    assert_eq!(detailed.mood_distribution[0].count, 2);
    assert_eq!(detailed.dreams_by_month[0].count, 1);
    assert_eq!(detailed.current_streak, 1);
}

// ============================================
// Journal Isolation
// ============================================

#[test]
fn test_journals_do_not_leak() {
    let (_guard, db, journal_id) = test_db();
    let other = db
        .ensure_journal("nightmares")
        .expect("journal should be created");

    db.insert_dream(journal_id, &dream("mine", Some("calm"), Some(5), "2025-08-25"))
        .expect("insert should succeed");
    db.insert_dream(other.id, &dream("theirs", Some("tense"), Some(1), "2025-08-25"))
        .expect("insert should succeed");

    assert_eq!(db.count_dreams(journal_id).expect("count"), 1);
    assert_eq!(db.count_dreams(other.id).expect("count"), 1);

    let summary = stats::generate_summary(&db, journal_id).expect("summary should compute");
    assert_eq!(summary.total, 1);
    assert_eq!(summary.mood_counts.get("tense"), None);

    let journals = db.list_journals().expect("list should succeed");
    assert_eq!(journals.len(), 2);
    for entry in journals {
        assert_eq!(entry.dream_count, 1);
    }
}

// ============================================
// Backup Round Trip Through a File
// ============================================

#[test]
fn test_backup_file_round_trip() {
    let (_guard, db, journal_id) = test_db();

    db.insert_dream(
        journal_id,
        &NewDream {
            body: "library with endless stairs".to_string(),
            mood: Some("curious".to_string()),
            lucidity: Some(8),
            tags: vec!["stairs".to_string(), "books".to_string()],
            dream_date: Some("2025-06-01".to_string()),
            ..Default::default()
        },
    )
    .expect("insert should succeed");
    db.insert_dream(
        journal_id,
        &dream("teeth again", Some("anxious"), Some(2), "2025-06-02"),
    )
    .expect("insert should succeed");

    // Export to an actual file
    let backup = export_backup(&db, journal_id).expect("export should succeed");
    let backup_path = _guard.path().join("backup.json");
    std::fs::write(
        &backup_path,
        backup.to_json_pretty().expect("serialize should succeed"),
    )
    .expect("write should succeed");

    // Restore from the file into a fresh journal
    let contents = std::fs::read_to_string(&backup_path).expect("read should succeed");
    let parsed = Backup::from_json(&contents).expect("parse should succeed");
    assert_eq!(parsed.total_dreams, 2);

    let restored_journal = db
        .ensure_journal("restored")
        .expect("journal should be created");
    let report =
        import_backup(&db, restored_journal.id, &parsed, false).expect("import should succeed");
    assert_eq!(report.imported, 2);
    assert_eq!(report.errors, 0);

    // Restored journal matches the original, record for record
    let original = db.dreams_for_backup(journal_id).expect("list should succeed");
    let restored = db
        .dreams_for_backup(restored_journal.id)
        .expect("list should succeed");
    assert_eq!(original.len(), restored.len());
    for (a, b) in original.iter().zip(restored.iter()) {
        assert_eq!(a.body, b.body);
        assert_eq!(a.mood, b.mood);
        assert_eq!(a.lucidity, b.lucidity);
        assert_eq!(a.tags, b.tags);
        assert_eq!(a.dream_date, b.dream_date);
        assert_eq!(a.created_at, b.created_at);
    }

    // Importing the same file into the same journal again is a no-op
    let report =
        import_backup(&db, restored_journal.id, &parsed, false).expect("import should succeed");
    assert_eq!(report.imported, 0);
    assert_eq!(report.skipped, 2);
}

// ============================================
// Persistence Across Reopen
// ============================================

#[test]
fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().expect("temp dir should be created");
    let db_path = temp_dir.path().join("journal.db");

    let journal_id = {
        let db = Database::open(&db_path).expect("database should open");
        db.migrate().expect("migrations should run");
        let journal = db
            .ensure_journal("default")
            .expect("journal should be created");
        db.insert_dream(
            journal.id,
            &dream("persisted", Some("calm"), Some(5), "2025-08-25"),
        )
        .expect("insert should succeed");
        journal.id
    };

    let db = Database::open(&db_path).expect("database should reopen");
    db.migrate().expect("migrations should be a no-op");
    assert_eq!(db.count_dreams(journal_id).expect("count"), 1);

    let journal = db.ensure_journal("default").expect("journal should resolve");
    assert_eq!(
        journal.id, journal_id,
        "existing journal is reused, not recreated"
    );
}
