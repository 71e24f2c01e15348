//! oneiro - personal dream journal CLI
//!
//! Record dreams, browse and edit them, and inspect journal statistics.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/oneiro/journal.db (~/.local/share/oneiro/journal.db)
//! - Config: $XDG_CONFIG_HOME/oneiro/config.toml (~/.config/oneiro/config.toml)
//! - Logs: $XDG_STATE_HOME/oneiro/oneiro.log (~/.local/state/oneiro/oneiro.log)

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use oneiro_core::backup::{export_backup, import_backup, Backup};
use oneiro_core::stats::{generate_detailed, generate_summary, DetailedStats, StatsSummary};
use oneiro_core::types::{DreamFilter, DreamPatch, Journal, NewDream};
use oneiro_core::{logging, Config, Database};

#[derive(Parser)]
#[command(name = "oneiro")]
#[command(about = "Personal dream journal")]
#[command(version)]
struct Args {
    /// Journal to operate on (default: from config)
    #[arg(long, global = true)]
    journal: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a new dream
    Add(AddArgs),

    /// List dreams, newest first
    List(ListArgs),

    /// Show one dream in full
    Show {
        /// Dream id
        id: i64,
    },

    /// Change fields on an existing dream
    Edit(EditArgs),

    /// Delete a dream
    Delete {
        /// Dream id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// List the journal's distinct tags
    Tags,

    /// Journal statistics
    Stats(StatsArgs),

    /// Write a JSON backup to a file or stdout
    Export {
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Restore dreams from a JSON backup
    Import {
        /// Backup file to read
        file: PathBuf,

        /// Report what would happen without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List journals with their record counts
    Journals,
}

#[derive(clap::Args)]
struct AddArgs {
    /// The dream narrative
    body: String,

    /// Short title
    #[arg(long)]
    title: Option<String>,

    /// Mood label (free-form: "calm", "anxious", ...)
    #[arg(long)]
    mood: Option<String>,

    /// Lucidity self-rating, nominally 1-10
    #[arg(long)]
    lucidity: Option<i64>,

    /// Sleep quality self-rating, nominally 1-10
    #[arg(long)]
    sleep_quality: Option<i64>,

    /// Tag for the dream; repeat for several
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Dream date as YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Substring to find in titles and bodies
    #[arg(long)]
    search: Option<String>,

    /// Only dreams with this exact mood
    #[arg(long)]
    mood: Option<String>,

    /// Only dreams carrying this tag
    #[arg(long)]
    tag: Option<String>,

    /// Maximum rows (default: from config)
    #[arg(long)]
    limit: Option<i64>,

    /// Rows to skip
    #[arg(long)]
    offset: Option<i64>,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Dream id
    id: i64,

    /// New title
    #[arg(long)]
    title: Option<String>,

    /// New narrative
    #[arg(long)]
    body: Option<String>,

    /// New mood
    #[arg(long)]
    mood: Option<String>,

    /// New lucidity rating
    #[arg(long)]
    lucidity: Option<i64>,

    /// New sleep quality rating
    #[arg(long)]
    sleep_quality: Option<i64>,

    /// Replacement tag list; repeat for several
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// New dream date as YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,

    /// Remove the mood
    #[arg(long, conflicts_with = "mood")]
    clear_mood: bool,

    /// Remove the dream date
    #[arg(long, conflicts_with = "date")]
    clear_date: bool,
}

#[derive(clap::Args)]
struct StatsArgs {
    /// Full breakdown: months, weekdays, moods, tags, trend, streak
    #[arg(long)]
    detailed: bool,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }

    let _log_guard = logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = Config::database_path();
    tracing::debug!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let journal_name = args.journal.as_deref().unwrap_or(&config.journal.default);
    let journal = db
        .ensure_journal(journal_name)
        .context("failed to open journal")?;

    match args.command {
        Command::Add(add_args) => cmd_add(&db, &journal, add_args),
        Command::List(list_args) => cmd_list(&db, &journal, &config, list_args),
        Command::Show { id } => cmd_show(&db, &journal, id),
        Command::Edit(edit_args) => cmd_edit(&db, &journal, edit_args),
        Command::Delete { id, force } => cmd_delete(&db, &journal, id, force),
        Command::Tags => cmd_tags(&db, &journal),
        Command::Stats(stats_args) => cmd_stats(&db, &journal, stats_args),
        Command::Export { output } => cmd_export(&db, &journal, output),
        Command::Import { file, dry_run } => cmd_import(&db, &journal, file, dry_run),
        Command::Journals => cmd_journals(&db, &config),
    }
}

// ============================================
// Commands
// ============================================

fn cmd_add(db: &Database, journal: &Journal, args: AddArgs) -> Result<()> {
    let dream_date = args.date.as_deref().map(parse_date_arg).transpose()?;

    let new_dream = NewDream {
        title: args.title,
        body: args.body,
        mood: args.mood,
        lucidity: args.lucidity,
        sleep_quality: args.sleep_quality,
        tags: args.tags,
        dream_date,
    };

    let dream = db.insert_dream(journal.id, &new_dream)?;
    println!(
        "Recorded dream #{} in '{}' ({})",
        dream.id,
        journal.name,
        dream.dream_date.as_deref().unwrap_or("no date")
    );
    Ok(())
}

fn cmd_list(db: &Database, journal: &Journal, config: &Config, args: ListArgs) -> Result<()> {
    let filter = DreamFilter {
        search: args.search,
        mood: args.mood,
        tag: args.tag,
        limit: args.limit.or(Some(config.list.page_size)),
        offset: args.offset,
    };
    let unfiltered = filter.search.is_none() && filter.mood.is_none() && filter.tag.is_none();

    let dreams = db.list_dreams(journal.id, &filter)?;
    if dreams.is_empty() {
        println!("No dreams found in '{}'.", journal.name);
        return Ok(());
    }

    println!(
        "{:<5} {:<11} {:<10} {:<36} {}",
        "ID", "Date", "Mood", "Dream", "Tags"
    );
    println!("{:-<78}", "");

    for dream in &dreams {
        let text = dream
            .title
            .as_deref()
            .unwrap_or(&dream.body)
            .replace('\n', " ");
        println!(
            "{:<5} {:<11} {:<10} {:<36} {}",
            dream.id,
            dream.dream_date.as_deref().unwrap_or("-"),
            dream.mood.as_deref().unwrap_or("-"),
            snippet(&text, 34),
            dream.tags.join(", ")
        );
    }

    if unfiltered {
        let total = db.count_dreams(journal.id)?;
        if (dreams.len() as i64) < total {
            println!();
            println!("Showing {} of {} dreams.", dreams.len(), total);
        }
    }
    Ok(())
}

fn cmd_show(db: &Database, journal: &Journal, id: i64) -> Result<()> {
    let dream = db
        .get_dream(journal.id, id)?
        .with_context(|| format!("dream {} not found in journal '{}'", id, journal.name))?;

    println!();
    println!("Dream #{}", dream.id);
    println!("{:-<40}", "");
    println!(
        "Date:     {}",
        dream.dream_date.as_deref().unwrap_or("(none)")
    );
    if let Some(title) = &dream.title {
        println!("Title:    {}", title);
    }
    if let Some(mood) = &dream.mood {
        println!("Mood:     {}", mood);
    }
    if let Some(lucidity) = dream.lucidity {
        println!("Lucidity: {}/10", lucidity);
    }
    if let Some(quality) = dream.sleep_quality {
        println!("Sleep:    {}/10", quality);
    }
    if !dream.tags.is_empty() {
        println!("Tags:     {}", dream.tags.join(", "));
    }
    println!(
        "Recorded: {}",
        dream
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    );
    println!();
    println!("{}", dream.body);
    println!();
    Ok(())
}

fn cmd_edit(db: &Database, journal: &Journal, args: EditArgs) -> Result<()> {
    let dream_date = if args.clear_date {
        Some(None)
    } else {
        args.date
            .as_deref()
            .map(parse_date_arg)
            .transpose()?
            .map(Some)
    };

    let patch = DreamPatch {
        title: args.title.map(Some),
        body: args.body,
        mood: if args.clear_mood {
            Some(None)
        } else {
            args.mood.map(Some)
        },
        lucidity: args.lucidity.map(Some),
        sleep_quality: args.sleep_quality.map(Some),
        tags: if args.tags.is_empty() {
            None
        } else {
            Some(args.tags)
        },
        dream_date,
    };

    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    let updated = db
        .update_dream(journal.id, args.id, &patch)?
        .with_context(|| format!("dream {} not found in journal '{}'", args.id, journal.name))?;
    println!("Updated dream #{}", updated.id);
    Ok(())
}

fn cmd_delete(db: &Database, journal: &Journal, id: i64, force: bool) -> Result<()> {
    let dream = db
        .get_dream(journal.id, id)?
        .with_context(|| format!("dream {} not found in journal '{}'", id, journal.name))?;

    if !force {
        let label = dream
            .title
            .as_deref()
            .unwrap_or(&dream.body)
            .replace('\n', " ");
        if !confirm(&format!("Delete dream #{} ({})?", id, snippet(&label, 40)))? {
            println!("Aborted.");
            return Ok(());
        }
    }

    db.delete_dream(journal.id, id)?;
    println!("Deleted dream #{}", id);
    Ok(())
}

fn cmd_tags(db: &Database, journal: &Journal) -> Result<()> {
    let tags = db.list_tags(journal.id)?;
    if tags.is_empty() {
        println!("No tags in '{}' yet.", journal.name);
        return Ok(());
    }
    for tag in tags {
        println!("{}", tag);
    }
    Ok(())
}

fn cmd_stats(db: &Database, journal: &Journal, args: StatsArgs) -> Result<()> {
    match (args.detailed, args.format.as_str()) {
        (false, "text") => {
            let summary = generate_summary(db, journal.id)?;
            print_summary_text(journal, &summary);
        }
        (false, "json") => {
            let summary = generate_summary(db, journal.id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        (true, "text") => {
            let stats = generate_detailed(db, journal.id, Local::now().date_naive())?;
            print_detailed_text(journal, &stats);
        }
        (true, "json") => {
            let stats = generate_detailed(db, journal.id, Local::now().date_naive())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        (_, other) => bail!("unknown format '{}': use 'text' or 'json'", other),
    }
    Ok(())
}

fn cmd_export(db: &Database, journal: &Journal, output: Option<PathBuf>) -> Result<()> {
    let backup = export_backup(db, journal.id)?;
    let json = backup.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Exported {} dream(s) from '{}' to {}",
                backup.total_dreams,
                journal.name,
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_import(db: &Database, journal: &Journal, file: PathBuf, dry_run: bool) -> Result<()> {
    let contents = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let backup = Backup::from_json(&contents)
        .with_context(|| format!("{} is not a dream journal backup", file.display()))?;

    let report = import_backup(db, journal.id, &backup, dry_run)?;

    let verb = if dry_run { "Would import" } else { "Imported" };
    println!(
        "{} {} dream(s) into '{}': {} skipped, {} error(s), {} in file",
        verb, report.imported, journal.name, report.skipped, report.errors, report.total
    );
    if report.errors > 0 {
        println!("Some records could not be restored; see the log for details.");
    }
    Ok(())
}

fn cmd_journals(db: &Database, config: &Config) -> Result<()> {
    let journals = db.list_journals()?;

    println!("{:<24} {:>8}  {}", "Journal", "Dreams", "Created");
    println!("{:-<44}", "");
    for entry in journals {
        let marker = if entry.journal.name == config.journal.default {
            "*"
        } else {
            " "
        };
        println!(
            "{:<23}{} {:>8}  {}",
            entry.journal.name,
            marker,
            entry.dream_count,
            entry
                .journal
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d")
        );
    }
    println!();
    println!("* default journal");
    Ok(())
}

// ============================================
// Rendering
// ============================================

fn print_summary_text(journal: &Journal, summary: &StatsSummary) {
    println!();
    println!("Dream Journal Summary: {}", journal.name);
    println!("{:=<40}", "");
    println!();

    if summary.total == 0 {
        println!("  No dreams recorded yet.");
        println!();
        return;
    }

    println!("  Dreams recorded:  {}", summary.total);
    match summary.average_lucidity {
        Some(avg) => println!("  Average lucidity: {:.1}", avg),
        None => println!("  Average lucidity: (no ratings)"),
    }

    if !summary.mood_counts.is_empty() {
        println!();
        println!("  MOODS");
        for (mood, count) in &summary.mood_counts {
            println!("    {:<14} {:>4}", mood, count);
        }
    }
    println!();
}

fn print_detailed_text(journal: &Journal, stats: &DetailedStats) {
    println!();
    println!("╭{}╮", "─".repeat(56));
    println!("│{:^56}│", format!("Dream Journal: {}", journal.name));
    println!("╰{}╯", "─".repeat(56));
    println!();

    if stats.total_dreams == 0 {
        println!("  No dreams recorded yet.");
        println!();
        return;
    }

    println!("SUMMARY");
    println!(
        "   Dreams: {:<8} Streak: {} day{}",
        stats.total_dreams,
        stats.current_streak,
        if stats.current_streak == 1 { "" } else { "s" }
    );
    println!();

    if !stats.dreams_by_month.is_empty() {
        println!("BY MONTH");
        let max = stats
            .dreams_by_month
            .iter()
            .map(|b| b.count)
            .max()
            .unwrap_or(1);
        for bucket in &stats.dreams_by_month {
            match bucket.avg_lucidity {
                Some(avg) => println!(
                    "   {}  {:>4}  {:<20} lucidity {:.1}",
                    bucket.month,
                    bucket.count,
                    bar(bucket.count, max),
                    avg
                ),
                None => println!(
                    "   {}  {:>4}  {}",
                    bucket.month,
                    bucket.count,
                    bar(bucket.count, max)
                ),
            }
        }
        println!();
    }

    if !stats.dreams_by_day.is_empty() {
        println!("BY WEEKDAY");
        let max = stats
            .dreams_by_day
            .iter()
            .map(|b| b.count)
            .max()
            .unwrap_or(1);
        for bucket in &stats.dreams_by_day {
            println!(
                "   {:<10} {:>4}  {}",
                bucket.day,
                bucket.count,
                bar(bucket.count, max)
            );
        }
        println!();
    }

    if !stats.mood_distribution.is_empty() {
        println!("MOODS");
        for (i, mood) in stats.mood_distribution.iter().enumerate() {
            println!("   {}. {:<14} {:>4}", i + 1, mood.mood, mood.count);
        }
        println!();
    }

    if !stats.top_tags.is_empty() {
        println!("TOP TAGS");
        for (i, tag) in stats.top_tags.iter().enumerate() {
            println!("   {}. {:<14} {:>4}", i + 1, tag.tag, tag.count);
        }
        println!();
    }

    if !stats.lucidity_trend.is_empty() {
        println!("LUCIDITY TREND");
        for point in &stats.lucidity_trend {
            println!("   {}  {:.1}", point.month, point.avg_lucidity);
        }
        println!();
    }
}

// ============================================
// Helpers
// ============================================

/// Validate a user-supplied dream date as YYYY-MM-DD.
///
/// Storage itself stays permissive; only flag input is rejected.
fn parse_date_arg(raw: &str) -> Result<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| anyhow::anyhow!("invalid date '{}': expected YYYY-MM-DD", raw))
}

/// Proportional bar for count displays, scaled to the largest bucket.
fn bar(count: i64, max: i64) -> String {
    const WIDTH: i64 = 20;
    if max <= 0 || count <= 0 {
        return String::new();
    }
    let len = ((count * WIDTH + max - 1) / max).max(1) as usize;
    "█".repeat(len)
}

/// Truncate to at most `max_chars` characters, with an ellipsis.
fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
