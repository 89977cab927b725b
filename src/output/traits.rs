//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and
//! associated error types.

use crate::crawler::RunSummary;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for output handlers
///
/// An output handler receives every finished run once. Handlers are
/// independent: one failing does not prevent the others from writing.
pub trait OutputHandler: Send {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Writes a finished run
    ///
    /// # Arguments
    ///
    /// * `summary` - The run as returned by the engine
    fn write_run(&mut self, summary: &RunSummary) -> OutputResult<()>;
}
