//! Database repository layer
//!
//! Provides query and insert operations for journals and dream records.
//! Every dream operation is scoped by journal id, so callers (and the stats
//! engine in particular) can treat any record set they fetch as belonging to
//! a single owner.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Local, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

/// Journal with a pre-computed record count for list views.
#[derive(Debug, Clone)]
pub struct JournalSummary {
    /// Journal record
    pub journal: Journal,
    /// Number of dreams in the journal
    pub dream_count: i64,
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Journal operations
    // ============================================

    /// Get a journal by name, creating it if it does not exist
    pub fn ensure_journal(&self, name: &str) -> Result<Journal> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config("journal name must not be empty".to_string()));
        }

        let conn = self.conn.lock().unwrap();
        if let Some(journal) = Self::fetch_journal(&conn, name)? {
            return Ok(journal);
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO journals (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
            params![name, now, now],
        )?;
        tracing::info!(journal = name, "Created journal");

        Self::fetch_journal(&conn, name)?.ok_or_else(|| Error::JournalNotFound(name.to_string()))
    }

    /// Get a journal by name
    pub fn get_journal(&self, name: &str) -> Result<Option<Journal>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_journal(&conn, name)
    }

    /// List all journals with their record counts
    pub fn list_journals(&self) -> Result<Vec<JournalSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT j.*, COUNT(d.id) as dream_count
            FROM journals j
            LEFT JOIN dreams d ON d.journal_id = j.id
            GROUP BY j.id
            ORDER BY j.name ASC
            "#,
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(JournalSummary {
                    journal: Self::row_to_journal(row)?,
                    dream_count: row.get("dream_count")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    fn fetch_journal(conn: &Connection, name: &str) -> Result<Option<Journal>> {
        conn.query_row("SELECT * FROM journals WHERE name = ?", [name], |row| {
            Self::row_to_journal(row)
        })
        .optional()
        .map_err(Error::from)
    }

    fn row_to_journal(row: &Row) -> rusqlite::Result<Journal> {
        let created_at_str: String = row.get("created_at")?;
        let updated_at_str: String = row.get("updated_at")?;

        Ok(Journal {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    // ============================================
    // Dream operations
    // ============================================

    /// Insert a new dream record
    ///
    /// A missing `dream_date` defaults to today's local calendar date.
    pub fn insert_dream(&self, journal_id: i64, dream: &NewDream) -> Result<Dream> {
        let now = Utc::now().to_rfc3339();
        let dream_date = dream
            .dream_date
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO dreams (journal_id, title, body, mood, lucidity, sleep_quality,
                                tags, dream_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                journal_id,
                dream.title,
                dream.body,
                dream.mood,
                dream.lucidity,
                dream.sleep_quality,
                serde_json::to_string(&dream.tags)?,
                dream_date,
                now,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::fetch_dream(&conn, journal_id, id)?.ok_or(Error::DreamNotFound(id))
    }

    /// Insert a dream with explicit timestamps and an as-given `dream_date`
    ///
    /// Used by backup import, which must preserve the original capture
    /// timestamps and must not default an absent date.
    pub fn insert_dream_at(
        &self,
        journal_id: i64,
        dream: &NewDream,
        created_at: &str,
        updated_at: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO dreams (journal_id, title, body, mood, lucidity, sleep_quality,
                                tags, dream_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                journal_id,
                dream.title,
                dream.body,
                dream.mood,
                dream.lucidity,
                dream.sleep_quality,
                serde_json::to_string(&dream.tags)?,
                dream.dream_date,
                created_at,
                updated_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a dream by id within a journal
    pub fn get_dream(&self, journal_id: i64, id: i64) -> Result<Option<Dream>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_dream(&conn, journal_id, id)
    }

    /// Apply a partial update to a dream
    ///
    /// Returns the updated record, or `None` if the dream does not exist in
    /// this journal. An empty patch leaves the record (and `updated_at`)
    /// untouched.
    pub fn update_dream(
        &self,
        journal_id: i64,
        id: i64,
        patch: &DreamPatch,
    ) -> Result<Option<Dream>> {
        let conn = self.conn.lock().unwrap();

        let Some(existing) = Self::fetch_dream(&conn, journal_id, id)? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(existing));
        }

        let mut fields: Vec<&str> = vec![];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(title) = &patch.title {
            fields.push("title = ?");
            params.push(Box::new(title.clone()));
        }
        if let Some(body) = &patch.body {
            fields.push("body = ?");
            params.push(Box::new(body.clone()));
        }
        if let Some(mood) = &patch.mood {
            fields.push("mood = ?");
            params.push(Box::new(mood.clone()));
        }
        if let Some(lucidity) = &patch.lucidity {
            fields.push("lucidity = ?");
            params.push(Box::new(*lucidity));
        }
        if let Some(sleep_quality) = &patch.sleep_quality {
            fields.push("sleep_quality = ?");
            params.push(Box::new(*sleep_quality));
        }
        if let Some(tags) = &patch.tags {
            fields.push("tags = ?");
            params.push(Box::new(serde_json::to_string(tags)?));
        }
        if let Some(dream_date) = &patch.dream_date {
            fields.push("dream_date = ?");
            params.push(Box::new(dream_date.clone()));
        }

        fields.push("updated_at = ?");
        params.push(Box::new(Utc::now().to_rfc3339()));
        params.push(Box::new(id));
        params.push(Box::new(journal_id));

        let sql = format!(
            "UPDATE dreams SET {} WHERE id = ? AND journal_id = ?",
            fields.join(", ")
        );
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::fetch_dream(&conn, journal_id, id)
    }

    /// Delete a dream, returning whether a record was removed
    pub fn delete_dream(&self, journal_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM dreams WHERE id = ? AND journal_id = ?",
            params![id, journal_id],
        )?;
        Ok(affected > 0)
    }

    /// List dreams with optional filtering, newest captures first
    pub fn list_dreams(&self, journal_id: i64, filter: &DreamFilter) -> Result<Vec<Dream>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from("SELECT * FROM dreams WHERE journal_id = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(journal_id)];

        if let Some(search) = &filter.search {
            sql.push_str(" AND (title LIKE ? OR body LIKE ?)");
            let pattern = format!("%{}%", search);
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        if let Some(mood) = &filter.mood {
            sql.push_str(" AND mood = ?");
            params.push(Box::new(mood.clone()));
        }

        if let Some(tag) = &filter.tag {
            // Match against the stored JSON text; tags are quoted strings
            sql.push_str(" AND tags LIKE ?");
            params.push(Box::new(format!("%\"{}\"%", tag)));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            filter.limit.unwrap_or(50),
            filter.offset.unwrap_or(0)
        ));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let dreams = stmt
            .query_map(params_refs.as_slice(), Self::row_to_dream)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dreams)
    }

    /// Count all dreams in a journal
    pub fn count_dreams(&self, journal_id: i64) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM dreams WHERE journal_id = ?",
            [journal_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    /// Distinct tags across a journal, sorted ascending
    ///
    /// This is set semantics for browsing; occurrence counting lives in the
    /// stats engine.
    pub fn list_tags(&self, journal_id: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT tags FROM dreams WHERE journal_id = ?")?;

        let mut all_tags = BTreeSet::new();
        let rows = stmt.query_map([journal_id], |row| row.get::<_, String>(0))?;
        for raw in rows.filter_map(|r| r.ok()) {
            all_tags.extend(parse_tags(&raw));
        }

        Ok(all_tags.into_iter().collect())
    }

    // ============================================
    // Stats accessors
    // ============================================

    /// The complete record set for one journal, in capture order
    ///
    /// Capture order (insert id ascending) makes downstream first-seen
    /// tie-breaking deterministic.
    pub fn dreams_for_stats(&self, journal_id: i64) -> Result<Vec<Dream>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM dreams WHERE journal_id = ? ORDER BY id ASC")?;

        let dreams = stmt
            .query_map([journal_id], Self::row_to_dream)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dreams)
    }

    /// The most recent dream dates, descending, for streak computation
    ///
    /// Records without a date can never contribute to a calendar streak and
    /// are excluded here rather than downstream.
    pub fn recent_dream_dates(&self, journal_id: i64, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT dream_date
            FROM dreams
            WHERE journal_id = ? AND dream_date IS NOT NULL
            ORDER BY dream_date DESC
            LIMIT {}
            "#,
            limit
        ))?;

        let dates = stmt
            .query_map([journal_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dates)
    }

    // ============================================
    // Backup accessors
    // ============================================

    /// All dreams in a journal, newest captures first (backup file order)
    pub fn dreams_for_backup(&self, journal_id: i64) -> Result<Vec<Dream>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM dreams WHERE journal_id = ? ORDER BY created_at DESC, id DESC")?;

        let dreams = stmt
            .query_map([journal_id], Self::row_to_dream)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dreams)
    }

    /// Whether a dream with this exact capture timestamp exists (import dedupe)
    pub fn dream_exists_at(&self, journal_id: i64, created_at: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM dreams WHERE journal_id = ? AND created_at = ? LIMIT 1",
                params![journal_id, created_at],
                |r| r.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }

    fn fetch_dream(conn: &Connection, journal_id: i64, id: i64) -> Result<Option<Dream>> {
        conn.query_row(
            "SELECT * FROM dreams WHERE id = ? AND journal_id = ?",
            params![id, journal_id],
            Self::row_to_dream,
        )
        .optional()
        .map_err(Error::from)
    }

    fn row_to_dream(row: &Row) -> rusqlite::Result<Dream> {
        let tags_str: String = row.get("tags")?;
        let created_at_str: String = row.get("created_at")?;
        let updated_at_str: String = row.get("updated_at")?;

        Ok(Dream {
            id: row.get("id")?,
            journal_id: row.get("journal_id")?,
            title: row.get("title")?,
            body: row.get("body")?,
            mood: row.get("mood")?,
            lucidity: row.get("lucidity")?,
            sleep_quality: row.get("sleep_quality")?,
            tags: parse_tags(&tags_str),
            dream_date: row.get("dream_date")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

/// Parse a stored tag column into a tag list.
///
/// A column that does not hold a JSON string array decodes as empty rather
/// than failing the row; one corrupt record must not break a listing.
fn parse_tags(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed tag column, treating as empty");
            Vec::new()
        }
    }
}
