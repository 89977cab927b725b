//! The crawl frontier
//!
//! This module handles:
//! - The FIFO queue of URLs waiting to be fetched
//! - Queued / in-flight / visited membership and deduplication
//! - Counters used for progress reporting

use serde::{Serialize, Serializer};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Where a queued URL came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The URL the run was started with
    Seed,
    /// An entry of the site's sitemap
    Sitemap,
    /// A link found on the given page
    Page(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed => write!(f, "seed"),
            Self::Sitemap => write!(f, "sitemap"),
            Self::Page(url) => write!(f, "{}", url),
        }
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub url: String,

    /// Link distance from the seed (seed and sitemap entries are 0)
    pub depth: u32,

    pub origin: Origin,
}

impl QueueItem {
    pub fn new(url: impl Into<String>, depth: u32, origin: Origin) -> Self {
        Self {
            url: url.into(),
            depth,
            origin,
        }
    }
}

/// FIFO work queue with queued, in-flight and visited sets
///
/// A URL is in at most one of the three sets. Once visited it stays visited
/// for the rest of the run.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<QueueItem>,
    queued: HashSet<String>,
    in_flight: HashSet<String>,
    visited: HashSet<String>,
    visit_order: Vec<String>,
    accepted: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item unless its URL is already known
    ///
    /// # Returns
    ///
    /// `true` if the item was queued, `false` if it was a duplicate
    pub fn push(&mut self, item: QueueItem) -> bool {
        if self.is_known(&item.url) {
            return false;
        }

        self.queued.insert(item.url.clone());
        self.queue.push_back(item);
        self.accepted += 1;
        true
    }

    /// Removes and returns the head of the queue
    ///
    /// The URL is no longer counted as queued; callers follow up with
    /// [`mark_in_flight`](Self::mark_in_flight) or [`mark_done`](Self::mark_done).
    pub fn pop(&mut self) -> Option<QueueItem> {
        let item = self.queue.pop_front()?;
        self.queued.remove(&item.url);
        Some(item)
    }

    pub fn mark_in_flight(&mut self, url: &str) {
        self.queued.remove(url);
        self.in_flight.insert(url.to_string());
    }

    /// Terminates a URL: success, failure and skips all end here
    pub fn mark_done(&mut self, url: &str) {
        self.in_flight.remove(url);
        self.queued.remove(url);
        if self.visited.insert(url.to_string()) {
            self.visit_order.push(url.to_string());
        }
    }

    /// True if the URL is queued, in flight or visited
    pub fn is_known(&self, url: &str) -> bool {
        self.queued.contains(url) || self.in_flight.contains(url) || self.visited.contains(url)
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Visited URLs in the order they were finished
    pub fn visit_order(&self) -> &[String] {
        &self.visit_order
    }

    /// Number of finished URLs
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of items ever accepted into the queue
    pub fn total_estimate(&self) -> usize {
        self.accepted
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
