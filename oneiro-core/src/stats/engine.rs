//! Aggregation passes over dream records
//!
//! All computation happens in one or two passes over the caller's snapshot.
//! The reference date (`today`) is always an argument: production callers
//! pass the local calendar date, tests pass fixed dates, and identical
//! inputs always produce identical output.

use crate::types::Dream;
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// How many of the most recent dated records feed the streak walk.
pub const STREAK_WINDOW: usize = 100;

// ============================================
// Output shapes
// ============================================

/// Basic aggregate counts over a journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    /// Number of records
    pub total: i64,
    /// Occurrences per mood label; records without a mood are excluded
    pub mood_counts: BTreeMap<String, i64>,
    /// Mean lucidity over records that have one, rounded to 1 decimal.
    /// `None` exactly when no record carries a lucidity value.
    pub average_lucidity: Option<f64>,
}

/// One month of activity within the trailing year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// Month key, `"YYYY-MM"`
    pub month: String,
    /// Records dated in this month
    pub count: i64,
    /// Unrounded mean lucidity of the month's records that have one
    pub avg_lucidity: Option<f64>,
}

/// Record count for one weekday.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayBucket {
    /// Day name, "Sunday" through "Saturday"
    pub day: &'static str,
    /// Records dated on this weekday
    pub count: i64,
}

/// Occurrence count for one mood label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodCount {
    pub mood: String,
    pub count: i64,
}

/// Occurrence count for one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Rounded monthly lucidity average within the trailing year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Month key, `"YYYY-MM"`
    pub month: String,
    /// Mean lucidity rounded to 1 decimal, over records that have one
    pub avg_lucidity: f64,
}

/// Full dashboard breakdown over a journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailedStats {
    /// Number of records
    pub total_dreams: i64,
    /// Trailing-12-month activity, ascending by month, empty months omitted
    pub dreams_by_month: Vec<MonthBucket>,
    /// Weekday distribution over all dated records, Sunday first
    pub dreams_by_day: Vec<WeekdayBucket>,
    /// Moods by occurrence count, descending; ties keep first-seen order
    pub mood_distribution: Vec<MoodCount>,
    /// Ten most frequent tags, counted per occurrence
    pub top_tags: Vec<TagCount>,
    /// Trailing-12-month lucidity averages
    pub lucidity_trend: Vec<TrendPoint>,
    /// Consecutive days (ending today or yesterday) with a record
    pub current_streak: i64,
}

// ============================================
// Summary
// ============================================

/// Compute the basic aggregate counts for a record set.
///
/// Total over everything, mood counts over records with a mood, mean
/// lucidity over records with a lucidity. Empty input degrades to zeros
/// and `None`; nothing here can fail.
pub fn compute_summary(dreams: &[Dream]) -> StatsSummary {
    let mut mood_counts: BTreeMap<String, i64> = BTreeMap::new();
    let mut lucidity_sum = 0i64;
    let mut lucidity_n = 0i64;

    for dream in dreams {
        if let Some(mood) = &dream.mood {
            *mood_counts.entry(mood.clone()).or_insert(0) += 1;
        }
        if let Some(lucidity) = dream.lucidity {
            lucidity_sum += lucidity;
            lucidity_n += 1;
        }
    }

    StatsSummary {
        total: dreams.len() as i64,
        mood_counts,
        average_lucidity: (lucidity_n > 0).then(|| round1(lucidity_sum as f64 / lucidity_n as f64)),
    }
}

// ============================================
// Detailed breakdown
// ============================================

#[derive(Default)]
struct MonthAcc {
    count: i64,
    lucidity_sum: i64,
    lucidity_n: i64,
}

/// Compute the full dashboard breakdown for a record set.
///
/// `recent_dates` is the caller's most-recent-dates window (see
/// [`STREAK_WINDOW`]); the streak is computed from it, not from `dreams`.
///
/// A record whose `dream_date` is absent or unparsable still counts in the
/// total and in mood/tag aggregates, but is skipped by every aggregate that
/// needs a calendar date. One defective record never fails the call.
pub fn compute_detailed(
    dreams: &[Dream],
    recent_dates: &[String],
    today: NaiveDate,
) -> DetailedStats {
    let floor = month_floor(today);

    let mut months: BTreeMap<String, MonthAcc> = BTreeMap::new();
    let mut trend: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    let mut weekdays = [0i64; 7];
    let mut moods = FirstSeenCounts::default();
    let mut tags = FirstSeenCounts::default();

    for dream in dreams {
        if let Some(mood) = &dream.mood {
            moods.add(mood);
        }
        for tag in &dream.tags {
            tags.add(tag);
        }

        let Some(date) = dream.dream_date.as_deref().and_then(parse_dream_date) else {
            continue;
        };

        weekdays[date.weekday().num_days_from_sunday() as usize] += 1;

        if date >= floor {
            let key = month_key(date);
            let acc = months.entry(key.clone()).or_default();
            acc.count += 1;
            if let Some(lucidity) = dream.lucidity {
                acc.lucidity_sum += lucidity;
                acc.lucidity_n += 1;
                let (sum, n) = trend.entry(key).or_insert((0, 0));
                *sum += lucidity;
                *n += 1;
            }
        }
    }

    let dreams_by_month = months
        .into_iter()
        .map(|(month, acc)| MonthBucket {
            month,
            count: acc.count,
            avg_lucidity: (acc.lucidity_n > 0)
                .then(|| acc.lucidity_sum as f64 / acc.lucidity_n as f64),
        })
        .collect();

    let dreams_by_day = weekdays
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(day, &count)| WeekdayBucket {
            day: day_name(day as u8),
            count,
        })
        .collect();

    let mood_distribution = moods
        .ranked()
        .into_iter()
        .map(|(mood, count)| MoodCount { mood, count })
        .collect();

    let top_tags = tags
        .ranked()
        .into_iter()
        .take(10)
        .map(|(tag, count)| TagCount { tag, count })
        .collect();

    let lucidity_trend = trend
        .into_iter()
        .map(|(month, (sum, n))| TrendPoint {
            month,
            avg_lucidity: round1(sum as f64 / n as f64),
        })
        .collect();

    DetailedStats {
        total_dreams: dreams.len() as i64,
        dreams_by_month,
        dreams_by_day,
        mood_distribution,
        top_tags,
        lucidity_trend,
        current_streak: compute_streak(recent_dates, today),
    }
}

// ============================================
// Streak
// ============================================

/// Walk the recent dates backwards from `today` and count consecutive days.
///
/// Dates are parsed (unusable entries dropped), deduplicated, and sorted
/// descending before the walk, so several records on one day count as one
/// day. Position `i` must sit exactly `i` days before today; the one
/// exception is the first position, which may match yesterday instead of
/// today so an unlogged "today" does not zero the streak. The first
/// mismatch ends the walk.
pub fn compute_streak(recent_dates: &[String], today: NaiveDate) -> i64 {
    let mut dates: Vec<NaiveDate> = recent_dates
        .iter()
        .filter_map(|raw| parse_dream_date(raw))
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let mut streak = 0i64;
    for (i, date) in dates.iter().enumerate() {
        let days_ago = (today - *date).num_days();
        if days_ago == i as i64 || (i == 0 && days_ago == 1) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

// ============================================
// Database glue
// ============================================

/// Compute the summary stats for one journal.
pub fn generate_summary(db: &crate::Database, journal_id: i64) -> crate::Result<StatsSummary> {
    let dreams = db.dreams_for_stats(journal_id)?;
    Ok(compute_summary(&dreams))
}

/// Compute the detailed stats for one journal as of `today`.
pub fn generate_detailed(
    db: &crate::Database,
    journal_id: i64,
    today: NaiveDate,
) -> crate::Result<DetailedStats> {
    let dreams = db.dreams_for_stats(journal_id)?;
    let recent_dates = db.recent_dream_dates(journal_id, STREAK_WINDOW)?;
    tracing::debug!(
        records = dreams.len(),
        window = recent_dates.len(),
        %today,
        "Computing detailed stats"
    );
    Ok(compute_detailed(&dreams, &recent_dates, today))
}

// ============================================
// Helpers
// ============================================

/// Counter that remembers insertion order for tie-breaking.
#[derive(Default)]
struct FirstSeenCounts {
    order: Vec<String>,
    counts: HashMap<String, i64>,
}

impl FirstSeenCounts {
    fn add(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_string(), 1);
                self.order.push(key.to_string());
            }
        }
    }

    /// Entries by count descending; equal counts keep first-seen order.
    fn ranked(self) -> Vec<(String, i64)> {
        let FirstSeenCounts { order, counts } = self;
        let mut ranked: Vec<(String, i64)> = order
            .into_iter()
            .map(|key| {
                let count = counts.get(&key).copied().unwrap_or(0);
                (key, count)
            })
            .collect();
        // Stable sort: ties stay in first-seen order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Parse a stored dream date, discarding any time component.
///
/// Accepts bare dates (`2025-03-14`) and ISO datetimes with or without a
/// fractional second or UTC offset. Anything else is unusable.
pub fn parse_dream_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

/// The oldest month admitted to the trailing-year buckets.
///
/// Calendar-month subtraction, not a fixed day count; a day-of-month past
/// the target month's end clamps to its last day.
fn month_floor(today: NaiveDate) -> NaiveDate {
    today.checked_sub_months(Months::new(12)).unwrap_or(today)
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

/// Round to one decimal, half up. Inputs here are non-negative means, so
/// `f64::round`'s half-away-from-zero is half-up.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
