//! JSON export of a run

use crate::crawler::RunSummary;
use crate::output::traits::{OutputHandler, OutputResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the run as pretty-printed JSON
///
/// The file holds the seed, start time, final state, statistics, results and
/// errors of the run.
pub fn write_results_json(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Output handler for `[output] results-path`
pub struct JsonOutput {
    path: PathBuf,
}

impl JsonOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for JsonOutput {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write_run(&mut self, summary: &RunSummary) -> OutputResult<()> {
        write_results_json(summary, &self.path)
    }
}
