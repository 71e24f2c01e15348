//! Core domain types for oneiro
//!
//! These types represent the stored data model: journals and the dream
//! records they own, plus the write payloads the storage layer accepts.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Journal** | A named collection of dream records; every record belongs to exactly one |
//! | **Dream** | One journal entry: free-text body plus structured metadata |
//! | **Mood** | Free-form label ("anxious", "euphoric", ...); open vocabulary, never an enum |
//! | **Lucidity** | Self-rated awareness, nominally 1-10; not range-enforced |
//! | **Tag** | Free-form string; one record carries an ordered list, duplicates allowed |
//! | **Dream date** | The calendar date the dream happened, as distinct from when it was recorded |
//! | **Streak** | Consecutive calendar days ending today (or yesterday) with at least one record |
//!
//! ### Dream date vs created_at
//!
//! `created_at` is set by storage and used for listing order and backup
//! dedupe. `dream_date` is user-supplied (defaulting to the capture date)
//! and drives every calendar statistic. It is kept as the raw stored string:
//! values are not guaranteed unique, present, or well-formed, and the stats
//! engine applies its own parse-and-skip policy rather than trusting them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Journal
// ============================================

/// A named collection of dream records.
///
/// Journals scope every read and write in the storage layer, so consumers
/// of a record set can assume single-owner data without re-filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    /// Unique identifier, assigned by storage
    pub id: i64,
    /// Unique non-empty name ("default" is created on first use)
    pub name: String,
    /// When this journal was created
    pub created_at: DateTime<Utc>,
    /// Most recent metadata change
    pub updated_at: DateTime<Utc>,
}

// ============================================
// Dream
// ============================================

/// One dream record as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dream {
    /// Unique identifier, assigned by storage
    pub id: i64,
    /// Owning journal
    pub journal_id: i64,
    /// Optional short title
    pub title: Option<String>,
    /// Free-text dream narrative
    pub body: String,
    /// Free-form mood label
    pub mood: Option<String>,
    /// Self-rated lucidity, nominally 1-10
    pub lucidity: Option<i64>,
    /// Self-rated sleep quality, nominally 1-10
    pub sleep_quality: Option<i64>,
    /// Ordered tag list; duplicates are legal and counted per occurrence
    pub tags: Vec<String>,
    /// Raw ISO date string as recorded; may be absent or malformed
    pub dream_date: Option<String>,
    /// When the record was captured
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a new dream record.
///
/// Ids and timestamps are assigned by storage; a missing `dream_date`
/// defaults to the local calendar date at insert time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDream {
    pub title: Option<String>,
    pub body: String,
    pub mood: Option<String>,
    pub lucidity: Option<i64>,
    pub sleep_quality: Option<i64>,
    pub tags: Vec<String>,
    pub dream_date: Option<String>,
}

/// Partial update for an existing dream record.
///
/// `None` leaves a field unchanged. The outer `Option` on nullable fields
/// distinguishes "leave alone" from "set to null": `Some(None)` clears.
/// `tags` replaces the whole list when present.
#[derive(Debug, Clone, Default)]
pub struct DreamPatch {
    pub title: Option<Option<String>>,
    pub body: Option<String>,
    pub mood: Option<Option<String>>,
    pub lucidity: Option<Option<i64>>,
    pub sleep_quality: Option<Option<i64>>,
    pub tags: Option<Vec<String>>,
    pub dream_date: Option<Option<String>>,
}

impl DreamPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.mood.is_none()
            && self.lucidity.is_none()
            && self.sleep_quality.is_none()
            && self.tags.is_none()
            && self.dream_date.is_none()
    }
}

// ============================================
// Listing filters
// ============================================

/// Filter for dream listings.
#[derive(Debug, Clone, Default)]
pub struct DreamFilter {
    /// Substring match against title or body
    pub search: Option<String>,
    /// Exact mood match
    pub mood: Option<String>,
    /// Record must carry this tag
    pub tag: Option<String>,
    /// Page size (defaults to 50 when unset)
    pub limit: Option<i64>,
    /// Page start
    pub offset: Option<i64>,
}
