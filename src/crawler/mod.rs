//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with timeout and retry
//! - The URL frontier and its visited bookkeeping
//! - Page processing and link discovery
//! - The engine that schedules workers and owns the run lifecycle

mod engine;
mod fetcher;
mod frontier;
mod observer;
mod processor;
mod result;

pub use engine::{CrawlEngine, ProgressSnapshot};
pub use fetcher::{
    backoff_delay, build_http_client, FetchResponse, Fetcher, HttpFetcher, RetryingFetch,
};
pub use frontier::{Frontier, Origin, QueueItem};
pub use observer::{LogLevel, Observer, TracingObserver};
pub use processor::{PageProcessor, ProcessedPage};
pub use result::{CrawlError, CrawlResult, CrawlStats, RunSummary};
