//! Output module for writing run results and reports
//!
//! This module handles:
//! - Exporting a finished run as JSON
//! - Generating markdown summaries
//! - Recording runs in the SQLite database and reading back statistics

mod json;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use json::{write_results_json, JsonOutput};
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownOutput};
pub use sqlite_output::SqliteOutputHandler;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputHandler, OutputResult};

use crate::config::OutputConfig;
use crate::crawler::RunSummary;
use crate::storage::open_storage;
use std::path::Path;
use tracing::{error, info};

/// Builds the handlers for every configured output path
///
/// # Arguments
///
/// * `config` - The `[output]` section; empty paths are skipped
/// * `config_hash` - Hash of the configuration file, stored with each run
///
/// # Returns
///
/// * `Ok(handlers)` - One handler per configured output
/// * `Err(OutputError)` - The database could not be opened
pub fn build_handlers(
    config: &OutputConfig,
    config_hash: &str,
) -> OutputResult<Vec<Box<dyn OutputHandler>>> {
    let mut handlers: Vec<Box<dyn OutputHandler>> = Vec::new();

    if !config.database_path.is_empty() {
        let storage = open_storage(Path::new(&config.database_path))?;
        handlers.push(Box::new(SqliteOutputHandler::new(storage, config_hash)));
    }
    if !config.summary_path.is_empty() {
        handlers.push(Box::new(MarkdownOutput::new(&config.summary_path)));
    }
    if !config.results_path.is_empty() {
        handlers.push(Box::new(JsonOutput::new(&config.results_path)));
    }

    Ok(handlers)
}

/// Writes a run to every handler
///
/// Returns the number of handlers that failed; each failure is logged.
pub fn write_outputs(handlers: &mut [Box<dyn OutputHandler>], summary: &RunSummary) -> usize {
    let mut failures = 0;

    for handler in handlers.iter_mut() {
        match handler.write_run(summary) {
            Ok(()) => info!("Wrote {} output", handler.name()),
            Err(e) => {
                error!("Failed to write {} output: {}", handler.name(), e);
                failures += 1;
            }
        }
    }

    failures
}
