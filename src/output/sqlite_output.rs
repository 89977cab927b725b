//! SQLite-based output handler implementation
//!
//! This module provides an output handler that records finished runs
//! in the SQLite storage backend.

use crate::crawler::RunSummary;
use crate::output::traits::{OutputHandler, OutputResult};
use crate::storage::{SqliteStorage, Storage};
use tracing::info;

/// SQLite-based output handler
///
/// Each finished run is stored with the hash of the configuration it ran
/// with, so `--stats` can later report on it.
pub struct SqliteOutputHandler {
    storage: SqliteStorage,
    config_hash: String,
}

impl SqliteOutputHandler {
    /// Creates a new SQLite output handler
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `config_hash` - Hash of the configuration file of the run
    pub fn new(storage: SqliteStorage, config_hash: impl Into<String>) -> Self {
        Self {
            storage,
            config_hash: config_hash.into(),
        }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }
}

impl OutputHandler for SqliteOutputHandler {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_run(&mut self, summary: &RunSummary) -> OutputResult<()> {
        let run_id = self.storage.record_run(summary, &self.config_hash)?;
        info!(
            "Stored run {} ({} results, {} errors)",
            run_id,
            summary.results.len(),
            summary.errors.len()
        );
        Ok(())
    }
}
