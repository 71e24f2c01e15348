use chrono::{Duration, Local};
use oneiro_core::Database;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("oneiro/journal.db")
    }

    fn backup_path(&self) -> PathBuf {
        self.home.join("backup.json")
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("oneiro"));

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute oneiro: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "oneiro {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn run_ok(env: &CliTestEnv, args: &[&str]) -> String {
    let output = run_bin(env, args);
    assert_success(args, &output);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn add_then_list_and_show() {
    let env = CliTestEnv::new();

    let stdout = run_ok(
        &env,
        &[
            "add",
            "flying over the harbor at night",
            "--title",
            "Harbor",
            "--mood",
            "calm",
            "--lucidity",
            "7",
            "--tag",
            "flying",
            "--tag",
            "water",
            "--date",
            "2025-03-14",
        ],
    );
    assert!(
        stdout.contains("Recorded dream #1"),
        "expected record confirmation, got:\n{stdout}"
    );

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let list_stdout = run_ok(&env, &["list"]);
    assert!(list_stdout.contains("Harbor"));
    assert!(list_stdout.contains("2025-03-14"));
    assert!(list_stdout.contains("calm"));

    let show_stdout = run_ok(&env, &["show", "1"]);
    assert!(show_stdout.contains("flying over the harbor at night"));
    assert!(show_stdout.contains("Lucidity: 7/10"));
    assert!(show_stdout.contains("Tags:     flying, water"));

    // The CLI's database is a normal library database
    let db = Database::open(&db_path).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    let journal = db.ensure_journal("default").expect("failed to open journal");
    assert_eq!(db.count_dreams(journal.id).expect("count"), 1);
}

#[test]
fn add_rejects_malformed_date() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["add", "slipping on ice", "--date", "last tuesday"]);
    assert!(
        !output.status.success(),
        "add with a bad --date should fail"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("YYYY-MM-DD"),
        "expected format hint in stderr, got:\n{stderr}"
    );
}

#[test]
fn stats_report_counts_and_streak() {
    let env = CliTestEnv::new();

    let today = Local::now().date_naive();
    let dates: Vec<String> = (0..3)
        .map(|i| (today - Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect();

    for (i, date) in dates.iter().enumerate() {
        let body = format!("dream number {}", i);
        let mood = if i == 0 { "calm" } else { "anxious" };
        run_ok(
            &env,
            &[
                "add", &body, "--mood", mood, "--lucidity", "6", "--tag", "recurring", "--date",
                date,
            ],
        );
    }

    let summary_stdout = run_ok(&env, &["stats", "--format", "json"]);
    let summary: serde_json::Value =
        serde_json::from_str(&summary_stdout).expect("summary should be JSON");
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["mood_counts"]["anxious"], 2);
    assert_eq!(summary["average_lucidity"], 6.0);

    let detailed_stdout = run_ok(&env, &["stats", "--detailed", "--format", "json"]);
    let detailed: serde_json::Value =
        serde_json::from_str(&detailed_stdout).expect("detailed should be JSON");
    assert_eq!(detailed["total_dreams"], 3);
    assert_eq!(detailed["current_streak"], 3);
    assert_eq!(detailed["top_tags"][0]["tag"], "recurring");
    assert_eq!(detailed["top_tags"][0]["count"], 3);
    assert!(detailed["dreams_by_month"]
        .as_array()
        .is_some_and(|months| !months.is_empty()));

    // Text rendering carries the same numbers
    let text_stdout = run_ok(&env, &["stats", "--detailed"]);
    assert!(text_stdout.contains("Streak: 3 days"));
    assert!(text_stdout.contains("TOP TAGS"));
}

#[test]
fn edit_and_delete_lifecycle() {
    let env = CliTestEnv::new();

    run_ok(&env, &["add", "standing in a silent house", "--mood", "eerie"]);

    run_ok(&env, &["edit", "1", "--mood", "calm", "--title", "Silent"]);
    let show_stdout = run_ok(&env, &["show", "1"]);
    assert!(show_stdout.contains("Mood:     calm"));
    assert!(show_stdout.contains("Title:    Silent"));

    run_ok(&env, &["edit", "1", "--clear-mood"]);
    let show_stdout = run_ok(&env, &["show", "1"]);
    assert!(!show_stdout.contains("Mood:"));

    run_ok(&env, &["delete", "1", "--force"]);
    let output = run_bin(&env, &["show", "1"]);
    assert!(!output.status.success(), "deleted dream should not resolve");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("not found"),
        "expected not-found error, got:\n{stderr}"
    );
}

#[test]
fn tags_are_distinct_and_sorted() {
    let env = CliTestEnv::new();

    run_ok(&env, &["add", "first", "--tag", "water", "--tag", "flying"]);
    run_ok(&env, &["add", "second", "--tag", "water"]);

    let stdout = run_ok(&env, &["tags"]);
    let tags: Vec<&str> = stdout.lines().collect();
    assert_eq!(tags, vec!["flying", "water"]);
}

#[test]
fn export_import_round_trip_across_journals() {
    let env = CliTestEnv::new();

    run_ok(&env, &["add", "first dream", "--date", "2025-03-14"]);
    run_ok(&env, &["add", "second dream", "--date", "2025-03-15"]);

    let backup_path = env.backup_path();
    let backup_str = backup_path.to_string_lossy().into_owned();
    let export_stdout = run_ok(&env, &["export", "--output", &backup_str]);
    assert!(export_stdout.contains("Exported 2 dream(s)"));
    assert!(backup_path.exists());

    // Same journal: everything is a duplicate
    let import_stdout = run_ok(&env, &["import", &backup_str]);
    assert!(
        import_stdout.contains("Imported 0 dream(s) into 'default': 2 skipped"),
        "unexpected import report:\n{import_stdout}"
    );

    // Dry run against a fresh journal reports without writing
    let dry_stdout = run_ok(&env, &["import", &backup_str, "--dry-run", "--journal", "copy"]);
    assert!(
        dry_stdout.contains("Would import 2 dream(s) into 'copy'"),
        "unexpected dry-run report:\n{dry_stdout}"
    );

    // The dry run wrote nothing, so a real import still finds 2 to restore
    let real_stdout = run_ok(&env, &["import", &backup_str, "--journal", "copy"]);
    assert!(
        real_stdout.contains("Imported 2 dream(s) into 'copy'"),
        "unexpected import report:\n{real_stdout}"
    );

    let journals_stdout = run_ok(&env, &["journals"]);
    assert!(journals_stdout.contains("default"));
    assert!(journals_stdout.contains("copy"));
}

#[test]
fn export_to_stdout_is_valid_backup_json() {
    let env = CliTestEnv::new();

    run_ok(&env, &["add", "rooftop garden", "--tag", "plants"]);

    let stdout = run_ok(&env, &["export"]);
    let backup: serde_json::Value =
        serde_json::from_str(&stdout).expect("export should print JSON");
    assert_eq!(backup["version"], "1.0");
    assert_eq!(backup["total_dreams"], 1);
    assert_eq!(backup["dreams"][0]["body"], "rooftop garden");
    assert_eq!(backup["dreams"][0]["tags"][0], "plants");
}
