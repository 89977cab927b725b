//! Records produced by a crawl run

use crate::crawler::frontier::Origin;
use crate::extract::ExtractedData;
use crate::state::RunState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One successfully processed page
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub url: String,
    pub depth: u32,
    pub origin: Origin,

    /// Text of `<title>`, "" when the page has none
    pub title: String,

    /// The page source as fetched
    pub raw_document: String,

    pub extracted_data: ExtractedData,
    pub timestamp: DateTime<Utc>,
}

/// A URL whose fetch or processing failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlError {
    pub url: String,
    pub origin: Origin,
    pub message: String,
}

/// Aggregate numbers for a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlStats {
    /// Dispatched URLs that finished (result, non-HTML skip or error)
    pub pages_processed: usize,
    pub duration_seconds: f64,
    pub success_rate_percent: f64,
    pub success_count: usize,
    pub error_count: usize,
    /// URLs accepted into the frontier during the run
    pub total_estimate: usize,
    /// URLs still queued when the run ended
    pub queue_remaining: usize,
}

impl CrawlStats {
    /// `(processed - errors) / processed * 100`, or 0 when nothing was processed
    pub fn success_rate(processed: usize, errors: usize) -> f64 {
        if processed == 0 {
            return 0.0;
        }
        let succeeded = processed.saturating_sub(errors) as f64;
        succeeded / processed as f64 * 100.0
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub results: Vec<CrawlResult>,
    pub errors: Vec<CrawlError>,
    pub stats: CrawlStats,
    pub final_state: RunState,
}
