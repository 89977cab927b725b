//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! run statistics from the storage layer.

use crate::storage::{ErrorRecord, RunRecord, Storage, StorageResult};
use std::collections::BTreeMap;

/// Statistics of the most recent stored run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub run: RunRecord,

    /// Number of stored runs
    pub total_runs: u64,

    /// Results stored across all runs
    pub total_results: u64,

    /// Results of the run per depth
    pub results_by_depth: BTreeMap<u32, u64>,

    /// Errors of the run
    pub errors: Vec<ErrorRecord>,
}

/// Loads statistics of the latest run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(Some(CrawlStatistics))` - Statistics of the latest run
/// * `Ok(None)` - No run has been stored yet
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<Option<CrawlStatistics>> {
    let Some(run) = storage.latest_run()? else {
        return Ok(None);
    };

    let total_runs = storage.count_runs()?;
    let total_results = storage.count_results()?;
    let results_by_depth = storage.results_by_depth(run.id)?;
    let errors = storage.errors_for_run(run.id)?;

    Ok(Some(CrawlStatistics {
        run,
        total_runs,
        total_results,
        results_by_depth,
        errors,
    }))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    let run = &stats.run;

    println!("=== Crawl Statistics ===\n");

    println!("Latest Run (#{}):", run.id);
    println!("  Seed: {}", run.seed);
    println!("  Started: {}", run.started_at);
    println!("  Finished: {}", run.finished_at);
    println!("  Status: {}", run.status);
    println!("  Duration: {:.2}s", run.duration_seconds);
    println!("  Config hash: {}", run.config_hash);
    println!();

    println!("Pages:");
    println!("  Processed: {}", run.pages_processed);
    println!("  Results: {}", run.success_count);
    println!("  Errors: {}", run.error_count);
    println!();

    if !stats.results_by_depth.is_empty() {
        println!("Results by Depth:");
        for (depth, count) in &stats.results_by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.errors.is_empty() {
        println!("Errors:");
        for error in stats.errors.iter().take(20) {
            println!("  {} - {}", error.url, error.message);
        }
        if stats.errors.len() > 20 {
            println!("  ... and {} more", stats.errors.len() - 20);
        }
        println!();
    }

    let success_rate = if run.pages_processed > 0 {
        (run.pages_processed.saturating_sub(run.error_count)) as f64 / run.pages_processed as f64
            * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages without error)",
        success_rate,
        run.pages_processed.saturating_sub(run.error_count),
        run.pages_processed
    );
    println!(
        "History: {} runs, {} results stored",
        stats.total_runs, stats.total_results
    );
}
