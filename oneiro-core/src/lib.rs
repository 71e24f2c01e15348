//! # oneiro-core
//!
//! Core library for oneiro - a local-first dream journal.
//!
//! This library provides:
//! - Domain types for journals and dream records
//! - Database storage layer with SQLite
//! - A statistics engine (moods, tags, time buckets, streaks)
//! - JSON backup export/import
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! The storage layer owns every record and scopes all reads and writes by
//! journal. The statistics engine never touches storage: it is a set of pure
//! functions over record snapshots the caller fetched, with the current date
//! passed in explicitly so results are reproducible.
//!
//! ## Example
//!
//! ```rust,no_run
//! use oneiro_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! let journal = db.ensure_journal(&config.journal.default).expect("failed to open journal");
//! ```

// Re-export commonly used items at the crate root
pub use backup::{Backup, ImportReport};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod stats;
pub mod types;
