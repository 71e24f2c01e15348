//! Statistics over a journal's dream history
//!
//! The engine is a set of pure functions over record snapshots: the caller
//! fetches a journal's records (and the recent-dates window for streaks),
//! passes the reference date in, and gets derived aggregates back. Nothing
//! in here reads the clock, touches storage, or caches between calls; every
//! invocation recomputes from the snapshot it is given.

pub mod engine;

pub use engine::{
    compute_detailed, compute_streak, compute_summary, generate_detailed, generate_summary,
    DetailedStats, MonthBucket, MoodCount, StatsSummary, TagCount, TrendPoint, WeekdayBucket,
    STREAK_WINDOW,
};
