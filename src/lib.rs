//! Web-Harvest: a polite site crawler and page extractor
//!
//! This crate crawls a web site from a seed URL, discovers pages through links
//! and sitemaps, respects robots.txt and scope rules, and extracts configurable
//! data from every page it visits.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod policy;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Web-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawler is already running")]
    AlreadyRunning,

    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Errors raised while fetching a URL
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error: {status}")]
    Status { url: String, status: u16 },

    #[error("Failed {url} after {retries} retries: {last}")]
    Exhausted {
        url: String,
        retries: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// The URL this error refers to
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url }
            | Self::Status { url, .. }
            | Self::Exhausted { url, .. } => url,
        }
    }
}

/// Errors raised while loading robots.txt or sitemaps
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("robots.txt unavailable at {url}: {reason}")]
    Robots { url: String, reason: String },

    #[error("sitemap unavailable at {url}: {reason}")]
    Sitemap { url: String, reason: String },
}

/// Errors raised by a single extraction module
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid XPath expression '{expression}': {reason}")]
    InvalidXPath { expression: String, reason: String },

    #[error("LLM request failed: {0}")]
    Llm(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Web-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlError, CrawlResult, RunSummary};
pub use state::RunState;
