//! Database layer for oneiro
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for journal-scoped queries
//! - Snapshot accessors consumed by the stats engine

pub mod repo;
pub mod schema;

pub use repo::{Database, JournalSummary};
