//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::RunSummary;
use crate::storage::{ErrorRecord, ResultRecord, RunRecord};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// A backend keeps the history of finished runs: one run row plus the
/// results and errors it produced.
pub trait Storage {
    // ===== Run Management =====

    /// Stores a finished run with its results and errors
    ///
    /// # Arguments
    ///
    /// * `summary` - The run as returned by the engine
    /// * `config_hash` - Hash of the configuration file used for the run
    ///
    /// # Returns
    ///
    /// The ID of the stored run
    fn record_run(&mut self, summary: &RunSummary, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Counts stored runs
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Results and Errors =====

    /// Results of a run, in the order they were produced
    fn results_for_run(&self, run_id: i64) -> StorageResult<Vec<ResultRecord>>;

    /// Errors of a run, in the order they were produced
    fn errors_for_run(&self, run_id: i64) -> StorageResult<Vec<ErrorRecord>>;

    /// Counts results across all runs
    fn count_results(&self) -> StorageResult<u64>;

    /// Counts the results of a run per depth
    fn results_by_depth(&self, run_id: i64) -> StorageResult<BTreeMap<u32, u64>>;
}
