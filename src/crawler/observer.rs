//! Progress and log sink for a crawl
//!
//! The engine reports user-visible events through an [`Observer`]. Calls come
//! from concurrent workers and are always made without internal locks held.

use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Severity of a user-visible event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// Receives log lines and progress updates from a running crawl
pub trait Observer: Send + Sync {
    fn on_log(&self, message: &str, level: LogLevel);

    /// `total` is the number of URLs accepted into the frontier so far
    fn on_progress(&self, processed: usize, total: usize, status: &str);
}

/// Forwards everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
    }

    fn on_progress(&self, processed: usize, total: usize, status: &str) {
        tracing::debug!(processed, total, status, "progress");
    }
}
