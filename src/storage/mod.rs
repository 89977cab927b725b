//! Storage module for persisting crawl runs
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Recording finished runs with their results and errors
//! - Querying run history for the `--stats` report

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::RunState;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub seed: String,
    pub started_at: String,
    pub finished_at: String,
    pub config_hash: String,
    pub status: RunState,
    pub pages_processed: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub duration_seconds: f64,
}

/// Represents a processed page of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub depth: u32,
    /// "seed", "sitemap" or the referring page URL
    pub origin: String,
    pub title: String,
    pub raw_document: String,
    /// The extracted data as JSON
    pub extracted_data: String,
    pub fetched_at: String,
}

/// Represents a failed URL of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub origin: String,
    pub message: String,
}
