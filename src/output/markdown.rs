//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a run,
//! including statistics, the depth breakdown, errors and the visited pages.

use crate::crawler::RunSummary;
use crate::output::traits::{OutputHandler, OutputResult};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pages listed before the table is cut off
const MAX_LISTED_PAGES: usize = 200;

/// Generates a markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The finished run
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run as markdown
///
/// # Arguments
///
/// * `summary` - The finished run
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Web-Harvest Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", summary.seed));
    md.push_str(&format!(
        "- **Started**: {}\n",
        summary.started_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        stats.duration_seconds
    ));
    md.push_str(&format!("- **Status**: {}\n\n", summary.final_state));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Pages Processed**: {}\n",
        stats.pages_processed
    ));
    md.push_str(&format!("- **Results**: {}\n", stats.success_count));
    md.push_str(&format!("- **Errors**: {}\n", stats.error_count));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        stats.success_rate_percent
    ));
    md.push_str(&format!(
        "- **URLs Discovered**: {}\n",
        stats.total_estimate
    ));
    md.push_str(&format!(
        "- **Left in Queue**: {}\n\n",
        stats.queue_remaining
    ));

    // Depth breakdown
    if !summary.results.is_empty() {
        let mut depths: BTreeMap<u32, usize> = BTreeMap::new();
        for result in &summary.results {
            *depths.entry(result.depth).or_default() += 1;
        }

        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !summary.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| URL | Found On | Message |\n");
        md.push_str("|-----|----------|---------|\n");
        for error in &summary.errors {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.url,
                error.origin,
                escape_cell(&error.message)
            ));
        }
        md.push('\n');
    }

    if !summary.results.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| URL | Depth | Title |\n");
        md.push_str("|-----|-------|-------|\n");
        for result in summary.results.iter().take(MAX_LISTED_PAGES) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                result.url,
                result.depth,
                escape_cell(&result.title)
            ));
        }
        if summary.results.len() > MAX_LISTED_PAGES {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.results.len() - MAX_LISTED_PAGES
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Output handler for `[output] summary-path`
pub struct MarkdownOutput {
    path: PathBuf,
}

impl MarkdownOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputHandler for MarkdownOutput {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn write_run(&mut self, summary: &RunSummary) -> OutputResult<()> {
        generate_markdown_summary(summary, &self.path)
    }
}
