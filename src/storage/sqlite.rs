//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::RunSummary;
use crate::state::RunState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ErrorRecord, ResultRecord, RunRecord};
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const RUN_COLUMNS: &str = "id, seed, started_at, finished_at, config_hash, status, \
     pages_processed, success_count, error_count, duration_seconds";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        seed: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunState::from_str_value(&row.get::<_, String>(5)?)
            .unwrap_or(RunState::Stopped),
        pages_processed: row.get::<_, i64>(6)? as u64,
        success_count: row.get::<_, i64>(7)? as u64,
        error_count: row.get::<_, i64>(8)? as u64,
        duration_seconds: row.get(9)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn record_run(&mut self, summary: &RunSummary, config_hash: &str) -> StorageResult<i64> {
        let stats = &summary.stats;
        let finished_at = summary.started_at
            + Duration::milliseconds((stats.duration_seconds * 1000.0) as i64);

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (seed, started_at, finished_at, config_hash, status,
             pages_processed, success_count, error_count, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                summary.seed,
                summary.started_at.to_rfc3339(),
                finished_at.to_rfc3339(),
                config_hash,
                summary.final_state.as_str(),
                stats.pages_processed as i64,
                stats.success_count as i64,
                stats.error_count as i64,
                stats.duration_seconds,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut insert_result = tx.prepare(
                "INSERT INTO results (run_id, url, depth, origin, title, raw_document,
                 extracted_data, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for result in &summary.results {
                let extracted = serde_json::to_string(&result.extracted_data)?;
                insert_result.execute(params![
                    run_id,
                    result.url,
                    result.depth,
                    result.origin.to_string(),
                    result.title,
                    result.raw_document,
                    extracted,
                    result.timestamp.to_rfc3339(),
                ])?;
            }

            let mut insert_error = tx.prepare(
                "INSERT INTO errors (run_id, url, origin, message) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for error in &summary.errors {
                insert_error.execute(params![
                    run_id,
                    error.url,
                    error.origin.to_string(),
                    error.message,
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Results and Errors =====

    fn results_for_run(&self, run_id: i64) -> StorageResult<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, url, depth, origin, title, raw_document, extracted_data, fetched_at
             FROM results WHERE run_id = ?1 ORDER BY id",
        )?;

        let results = stmt
            .query_map(params![run_id], |row| {
                Ok(ResultRecord {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    url: row.get(2)?,
                    depth: row.get(3)?,
                    origin: row.get(4)?,
                    title: row.get(5)?,
                    raw_document: row.get(6)?,
                    extracted_data: row.get(7)?,
                    fetched_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(results)
    }

    fn errors_for_run(&self, run_id: i64) -> StorageResult<Vec<ErrorRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, url, origin, message FROM errors WHERE run_id = ?1 ORDER BY id",
        )?;

        let errors = stmt
            .query_map(params![run_id], |row| {
                Ok(ErrorRecord {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    url: row.get(2)?,
                    origin: row.get(3)?,
                    message: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(errors)
    }

    fn count_results(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn results_by_depth(&self, run_id: i64) -> StorageResult<BTreeMap<u32, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT depth, COUNT(*) FROM results WHERE run_id = ?1 GROUP BY depth ORDER BY depth",
        )?;

        let mut breakdown = BTreeMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (depth, count) = row?;
            breakdown.insert(depth, count as u64);
        }

        Ok(breakdown)
    }
}
