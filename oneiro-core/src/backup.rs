//! JSON backup export and restore
//!
//! The backup file is a single JSON envelope: an `export_date`, a format
//! `version`, a record count, and the records themselves, newest first.
//! Import is deliberately forgiving about what it reads back. Old exports
//! and hand-edited files stay restorable: every record field is optional
//! except the body, tags may arrive as an array or as a JSON-encoded
//! string of one, and a record that cannot be read at all is counted and
//! skipped rather than aborting the run.
//!
//! Records are deduplicated by their capture timestamp within the target
//! journal, so re-importing a backup is a no-op for records that are
//! already present.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::NewDream;

/// Format version written to every export.
pub const BACKUP_VERSION: &str = "1.0";

// ============================================
// Envelope
// ============================================

/// A full-journal backup as written to and read from disk.
///
/// Records are kept as raw JSON values so that one malformed record fails
/// during import, as a counted per-record error, instead of rejecting the
/// whole file at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    /// When the export was produced; informational only
    #[serde(default = "Utc::now")]
    pub export_date: DateTime<Utc>,
    /// Format version; unrecognized values warn on import but still load
    #[serde(default)]
    pub version: String,
    /// Record count claimed by the file; `dreams.len()` is authoritative
    #[serde(default)]
    pub total_dreams: i64,
    /// The records, newest first
    pub dreams: Vec<Value>,
}

impl Backup {
    /// Parse a backup file's contents.
    ///
    /// Anything without a `dreams` array is rejected here, before any
    /// database work happens.
    pub fn from_json(json: &str) -> Result<Backup> {
        serde_json::from_str(json).map_err(|err| Error::InvalidBackup(err.to_string()))
    }

    /// Render the envelope as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One record inside a backup file.
///
/// Everything defaults so partial records import with whatever they carry.
/// `created_at`/`updated_at` stay raw strings here: the dedupe key is the
/// stored text, not a parsed instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDream {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub lucidity: Option<i64>,
    #[serde(default)]
    pub sleep_quality: Option<i64>,
    #[serde(default, deserialize_with = "tags_lenient")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dream_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<crate::types::Dream> for BackupDream {
    fn from(dream: crate::types::Dream) -> Self {
        BackupDream {
            title: dream.title,
            body: dream.body,
            mood: dream.mood,
            lucidity: dream.lucidity,
            sleep_quality: dream.sleep_quality,
            tags: dream.tags,
            dream_date: dream.dream_date,
            created_at: Some(dream.created_at.to_rfc3339()),
            updated_at: Some(dream.updated_at.to_rfc3339()),
        }
    }
}

/// Accept tags as an array of strings or as a JSON-encoded string of one.
/// Anything else degrades to an empty list instead of failing the record.
fn tags_lenient<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        other => serde_json::from_value(other).unwrap_or_default(),
    })
}

// ============================================
// Result of an import run
// ============================================

/// Per-run tally returned by [`import_backup`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Records written (or, on a dry run, that would have been)
    pub imported: i64,
    /// Records already present, matched by capture timestamp
    pub skipped: i64,
    /// Records that could not be read or written
    pub errors: i64,
    /// Records in the file
    pub total: i64,
}

// ============================================
// Export
// ============================================

/// Build the backup envelope for one journal.
pub fn export_backup(db: &Database, journal_id: i64) -> Result<Backup> {
    let dreams = db.dreams_for_backup(journal_id)?;
    tracing::info!(records = dreams.len(), journal_id, "Exporting backup");

    let mut records = Vec::with_capacity(dreams.len());
    for dream in dreams {
        records.push(serde_json::to_value(BackupDream::from(dream))?);
    }

    Ok(Backup {
        export_date: Utc::now(),
        version: BACKUP_VERSION.to_string(),
        total_dreams: records.len() as i64,
        dreams: records,
    })
}

// ============================================
// Import
// ============================================

/// Restore a backup into a journal.
///
/// Records whose capture timestamp already exists in the journal are
/// skipped. Unreadable records and failed writes increment `errors` and
/// the run continues. With `dry_run` nothing is written; the report says
/// what a real run would have done.
pub fn import_backup(
    db: &Database,
    journal_id: i64,
    backup: &Backup,
    dry_run: bool,
) -> Result<ImportReport> {
    if backup.version != BACKUP_VERSION {
        tracing::warn!(
            version = %backup.version,
            "Backup version is not {BACKUP_VERSION}; importing anyway"
        );
    }

    let mut report = ImportReport {
        total: backup.dreams.len() as i64,
        ..Default::default()
    };

    for value in &backup.dreams {
        let record: BackupDream = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable backup record");
                report.errors += 1;
                continue;
            }
        };

        let created_at = normalize_timestamp(record.created_at.as_deref());
        let updated_at = normalize_timestamp(record.updated_at.as_deref());

        match db.dream_exists_at(journal_id, &created_at) {
            Ok(true) => {
                report.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Could not check backup record for duplicates");
                report.errors += 1;
                continue;
            }
        }

        if dry_run {
            report.imported += 1;
            continue;
        }

        let new_dream = NewDream {
            title: record.title,
            body: record.body,
            mood: record.mood,
            lucidity: record.lucidity,
            sleep_quality: record.sleep_quality,
            tags: record.tags,
            dream_date: record.dream_date,
        };
        match db.insert_dream_at(journal_id, &new_dream, &created_at, &updated_at) {
            Ok(_) => report.imported += 1,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to write backup record");
                report.errors += 1;
            }
        }
    }

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        errors = report.errors,
        dry_run,
        "Backup import finished"
    );
    Ok(report)
}

/// Normalize an incoming timestamp to RFC 3339, the form storage writes.
///
/// Exports re-serialize stored timestamps the same way, so the dedupe
/// string comparison holds across export/import cycles even when the
/// original file spelled the instant differently. Absent or unreadable
/// values fall back to the current time.
fn normalize_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return Utc::now().to_rfc3339();
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc).to_rfc3339();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.and_utc().to_rfc3339();
        }
    }

    tracing::warn!(raw, "Unreadable backup timestamp, using current time");
    Utc::now().to_rfc3339()
}
