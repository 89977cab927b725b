//! Crawl engine - main crawl orchestration logic
//!
//! This module contains the scheduler that coordinates a run:
//! - Loading the admission policy and seeding the frontier
//! - A fixed pool of worker tasks pulling from the shared frontier
//! - Fetching with retry, page processing and link discovery
//! - Pause / resume / stop and progress reporting
//!
//! All run state lives behind one mutex. Workers that have nothing to do wait
//! on a `Notify` that is signalled whenever the frontier or the run state
//! changes. The observer is only ever called with the lock released.

use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher, RetryingFetch};
use crate::crawler::frontier::{Frontier, Origin, QueueItem};
use crate::crawler::observer::{LogLevel, Observer, TracingObserver};
use crate::crawler::processor::{PageProcessor, ProcessedPage};
use crate::crawler::result::{CrawlError, CrawlResult, CrawlStats, RunSummary};
use crate::extract::{OpenRouterSummarizer, Summarizer};
use crate::policy::PolicyGate;
use crate::state::{DispatchPacer, RunState};
use crate::url::parse_http_url;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub state: RunState,
    pub pages_processed: usize,
    pub total_estimate: usize,
    pub queue_depth: usize,
    pub in_flight: usize,
    pub results: usize,
    pub errors: usize,
}

/// Mutable state of the current (or last) run
#[derive(Default)]
struct Inner {
    state: RunState,
    frontier: Frontier,
    /// URLs handed to a worker; bounded by max-pages
    dispatched: usize,
    /// Dispatched URLs that finished
    processed: usize,
    results: Vec<CrawlResult>,
    errors: Vec<CrawlError>,
    /// Set from `start` until its summary is taken, including a stopped run's drain
    run_in_progress: bool,
}

impl Inner {
    fn progress(&self) -> (usize, usize, &'static str) {
        (
            self.processed,
            self.frontier.total_estimate(),
            self.state.status_label(),
        )
    }
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Notify,
}

/// Releases the run slot when `start` returns or is cancelled
struct RunSlot<'a> {
    shared: &'a Shared,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.shared.inner.lock().run_in_progress = false;
    }
}

/// The crawl scheduler
///
/// One engine runs one crawl at a time; `start` can be called again once the
/// previous `start` has returned and begins from a clean slate. Control
/// methods take `&self`, so an `Arc<CrawlEngine>` can be paused or stopped
/// from another task while `start` is running.
///
/// # Example
///
/// ```no_run
/// use web_harvest::{Config, CrawlEngine};
///
/// # async fn example() -> web_harvest::Result<()> {
/// let engine = CrawlEngine::new(Config::default())?;
/// let summary = engine.start("https://example.com/").await?;
/// println!("{} pages", summary.stats.pages_processed);
/// # Ok(())
/// # }
/// ```
pub struct CrawlEngine {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn Observer>,
    summarizer: Option<Arc<dyn Summarizer>>,
    shared: Arc<Shared>,
}

impl CrawlEngine {
    /// Creates an engine with the HTTP fetcher, tracing observer and, when
    /// `[llm] enabled` is set, the OpenRouter summarizer
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.user_agent)?);
        let summarizer: Option<Arc<dyn Summarizer>> = if config.llm.enabled {
            Some(Arc::new(OpenRouterSummarizer::from_config(&config.llm)?))
        } else {
            None
        };

        Ok(Self::with_fetcher(config, fetcher)
            .with_observer(Arc::new(TracingObserver))
            .with_summarizer_option(summarizer))
    }

    /// Creates an engine around any `Fetcher`
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            observer: Arc::new(TracingObserver),
            summarizer: None,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                wake: Notify::new(),
            }),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_summarizer(self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.with_summarizer_option(Some(summarizer))
    }

    fn with_summarizer_option(mut self, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawls from `seed` until the frontier is exhausted, the page cap is
    /// reached or the run is stopped
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Results, errors and statistics of the run
    /// * `Err(HarvestError::AlreadyRunning)` - A run is in progress or a stopped
    ///   run is still finishing its in-flight pages; it is left untouched
    /// * `Err(HarvestError::InvalidSeed)` - The seed is not an http(s) URL
    pub async fn start(&self, seed: &str) -> Result<RunSummary, HarvestError> {
        let seed_url = {
            let mut inner = self.shared.inner.lock();
            if inner.state.is_active() || inner.run_in_progress {
                return Err(HarvestError::AlreadyRunning);
            }

            let seed_url = parse_http_url(seed).map_err(|e| HarvestError::InvalidSeed {
                url: seed.to_string(),
                reason: e.to_string(),
            })?;

            *inner = Inner {
                state: RunState::Running,
                run_in_progress: true,
                ..Inner::default()
            };
            seed_url
        };
        let _slot = RunSlot {
            shared: &self.shared,
        };

        let started = Instant::now();
        let started_at = Utc::now();
        let seed = seed_url.to_string();

        self.log(&format!("Starting crawl from {}", seed), LogLevel::Info);
        self.log(
            &format!("Base URL: {}", seed_url.origin().ascii_serialization()),
            LogLevel::Info,
        );

        let policy = Arc::new(
            PolicyGate::load(
                &seed_url,
                &self.config,
                self.fetcher.as_ref(),
                self.observer.as_ref(),
            )
            .await,
        );

        let progress = {
            let mut inner = self.shared.inner.lock();
            for url in policy.sitemap_urls() {
                inner
                    .frontier
                    .push(QueueItem::new(url.clone(), 0, Origin::Sitemap));
            }
            if !inner.frontier.is_queued(&seed) {
                inner
                    .frontier
                    .push(QueueItem::new(seed.clone(), 0, Origin::Seed));
            }
            inner.progress()
        };
        self.shared.wake.notify_waiters();
        self.observer.on_progress(progress.0, progress.1, progress.2);

        self.run_workers(policy).await;

        let (summary, progress) = {
            let mut inner = self.shared.inner.lock();
            if inner.state.is_active() {
                inner.state = RunState::Completed;
            }
            let summary = self.build_summary(&mut inner, seed, started, started_at);
            (summary, inner.progress())
        };

        self.log(
            &format!(
                "Crawling {} in {:.2}s. Processed {} pages.",
                if summary.final_state == RunState::Stopped {
                    "stopped"
                } else {
                    "completed"
                },
                summary.stats.duration_seconds,
                summary.stats.pages_processed
            ),
            LogLevel::Info,
        );
        self.observer.on_progress(progress.0, progress.1, progress.2);

        Ok(summary)
    }

    /// Spawns the worker pool and waits for every worker to exit
    async fn run_workers(&self, policy: Arc<PolicyGate>) {
        let crawler = &self.config.crawler;
        let context = Arc::new(WorkerContext {
            shared: self.shared.clone(),
            policy,
            retrying: RetryingFetch::new(
                self.fetcher.clone(),
                crawler.max_retries,
                Duration::from_millis(crawler.request_timeout_ms),
            ),
            processor: PageProcessor::new(self.config.clone(), self.summarizer.clone()),
            observer: self.observer.clone(),
            max_pages: crawler.max_pages as usize,
            respect_robots: crawler.respect_robots,
            crawl_delay_ms: crawler.crawl_delay_ms,
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..crawler.concurrent_requests.max(1) {
            workers.spawn(run_worker(context.clone(), worker_id));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                self.log(&format!("Worker task failed: {}", e), LogLevel::Error);
            }
        }
    }

    fn build_summary(
        &self,
        inner: &mut Inner,
        seed: String,
        started: Instant,
        started_at: DateTime<Utc>,
    ) -> RunSummary {
        let processed = inner.processed;
        let error_count = inner.errors.len();
        let stats = CrawlStats {
            pages_processed: processed,
            duration_seconds: started.elapsed().as_secs_f64(),
            success_rate_percent: CrawlStats::success_rate(processed, error_count),
            success_count: inner.results.len(),
            error_count,
            total_estimate: inner.frontier.total_estimate(),
            queue_remaining: inner.frontier.queue_depth(),
        };

        RunSummary {
            seed,
            started_at,
            results: std::mem::take(&mut inner.results),
            errors: std::mem::take(&mut inner.errors),
            stats,
            final_state: inner.state,
        }
    }

    /// Stops dispatching new pages; in-flight pages still complete
    ///
    /// Returns false if the run was not Running.
    pub fn pause(&self) -> bool {
        self.transition(RunState::Running, RunState::Paused, "Crawler paused")
    }

    /// Resumes dispatching after `pause`
    ///
    /// Returns false if the run was not Paused.
    pub fn resume(&self) -> bool {
        self.transition(RunState::Paused, RunState::Running, "Crawler resumed")
    }

    /// Ends the run once in-flight pages complete
    ///
    /// Returns false if no run was active.
    pub fn stop(&self) -> bool {
        let progress = {
            let mut inner = self.shared.inner.lock();
            if !inner.state.is_active() {
                return false;
            }
            inner.state = RunState::Stopped;
            inner.progress()
        };

        self.shared.wake.notify_waiters();
        self.log("Crawler stopped", LogLevel::Info);
        self.observer.on_progress(progress.0, progress.1, progress.2);
        true
    }

    fn transition(&self, from: RunState, to: RunState, message: &str) -> bool {
        let progress = {
            let mut inner = self.shared.inner.lock();
            if inner.state != from {
                return false;
            }
            inner.state = to;
            inner.progress()
        };

        self.shared.wake.notify_waiters();
        self.log(message, LogLevel::Info);
        self.observer.on_progress(progress.0, progress.1, progress.2);
        true
    }

    pub fn state(&self) -> RunState {
        self.shared.inner.lock().state
    }

    pub fn progress(&self) -> ProgressSnapshot {
        let inner = self.shared.inner.lock();
        ProgressSnapshot {
            state: inner.state,
            pages_processed: inner.processed,
            total_estimate: inner.frontier.total_estimate(),
            queue_depth: inner.frontier.queue_depth(),
            in_flight: inner.frontier.in_flight_count(),
            results: inner.results.len(),
            errors: inner.errors.len(),
        }
    }

    /// URLs finished by the current or last run, in completion order
    pub fn visited_urls(&self) -> Vec<String> {
        self.shared.inner.lock().frontier.visit_order().to_vec()
    }

    fn log(&self, message: &str, level: LogLevel) {
        self.observer.on_log(message, level);
    }
}

/// What a worker does next
enum Action {
    Dispatch { item: QueueItem, first_of_run: bool },
    Wait,
    Exit,
}

/// How a dispatched URL ended
enum Outcome {
    Page(Box<ProcessedPage>),
    Skipped(String),
    Failed(String),
}

/// Read-only context shared by the workers of one run
struct WorkerContext {
    shared: Arc<Shared>,
    policy: Arc<PolicyGate>,
    retrying: RetryingFetch,
    processor: PageProcessor,
    observer: Arc<dyn Observer>,
    max_pages: usize,
    respect_robots: bool,
    crawl_delay_ms: u64,
}

async fn run_worker(context: Arc<WorkerContext>, worker_id: u32) {
    let mut pacer = DispatchPacer::new(context.crawl_delay_ms);

    loop {
        // Created before the state check so a notification in between is not lost
        let notified = context.shared.wake.notified();

        let (action, skipped) = context.next_action();
        for message in skipped {
            context.observer.on_log(&message, LogLevel::Info);
        }

        match action {
            Action::Exit => break,
            Action::Wait => notified.await,
            Action::Dispatch { item, first_of_run } => {
                pacer.wait_turn(first_of_run).await;
                context.handle(item).await;
            }
        }
    }

    debug!("Worker {} exiting", worker_id);
    context.shared.wake.notify_waiters();
}

impl WorkerContext {
    /// Picks the next admissible item, discarding the ones that are not
    ///
    /// Returns the decision and the skip messages to log.
    fn next_action(&self) -> (Action, Vec<String>) {
        let mut skipped = Vec::new();
        let mut inner = self.shared.inner.lock();

        match inner.state {
            RunState::Running => {}
            RunState::Paused => return (Action::Wait, skipped),
            RunState::Idle | RunState::Stopped | RunState::Completed => {
                return (Action::Exit, skipped)
            }
        }

        if inner.dispatched >= self.max_pages {
            return (Action::Exit, skipped);
        }

        while let Some(item) = inner.frontier.pop() {
            if !self
                .policy
                .in_scope(&item.url, item.depth, inner.frontier.visited())
            {
                skipped.push(format!("Skipping {} (out of scope)", item.url));
                inner.frontier.mark_done(&item.url);
                continue;
            }

            if self.respect_robots && !self.policy.is_allowed(&item.url) {
                skipped.push(format!("Skipping {} (disallowed by robots.txt)", item.url));
                inner.frontier.mark_done(&item.url);
                continue;
            }

            inner.frontier.mark_in_flight(&item.url);
            let first_of_run = inner.dispatched == 0;
            inner.dispatched += 1;
            return (Action::Dispatch { item, first_of_run }, skipped);
        }

        if inner.frontier.in_flight_count() == 0 {
            (Action::Exit, skipped)
        } else {
            (Action::Wait, skipped)
        }
    }

    async fn handle(&self, item: QueueItem) {
        let mut guard = DispatchGuard::new(self, &item);

        self.observer.on_log(
            &format!("Processing {} (depth: {})", item.url, item.depth),
            LogLevel::Info,
        );

        let outcome = match self.retrying.fetch(&item.url).await {
            Ok(response) if !response.is_html() => Outcome::Skipped(format!(
                "Skipping {} (not HTML: {})",
                item.url,
                response.content_type()
            )),
            Ok(response) => match self
                .processor
                .process(&item, &response, self.policy.base_origin())
                .await
            {
                Ok(page) => Outcome::Page(Box::new(page)),
                Err(e) => Outcome::Failed(e.to_string()),
            },
            Err(e) => Outcome::Failed(e.to_string()),
        };

        guard.disarm();
        self.complete(item.url, item.origin, outcome);
    }

    /// Records the end of a dispatched URL and wakes waiting workers
    fn complete(&self, url: String, origin: Origin, outcome: Outcome) {
        let mut messages = Vec::new();

        let progress = {
            let mut inner = self.shared.inner.lock();
            inner.frontier.mark_done(&url);
            inner.processed += 1;

            match outcome {
                Outcome::Page(page) => {
                    let ProcessedPage {
                        result,
                        discovered,
                        warnings,
                    } = *page;
                    let mut added = 0;
                    for link in discovered {
                        if inner.frontier.push(link) {
                            added += 1;
                        }
                    }
                    if added > 0 {
                        debug!("Queued {} new links from {}", added, url);
                    }
                    inner.results.push(result);
                    messages.extend(warnings.into_iter().map(|w| (w, LogLevel::Warning)));
                }
                Outcome::Skipped(message) => messages.push((message, LogLevel::Info)),
                Outcome::Failed(message) => {
                    messages.push((
                        format!("Error processing {}: {}", url, message),
                        LogLevel::Error,
                    ));
                    inner.errors.push(CrawlError {
                        url: url.clone(),
                        origin,
                        message,
                    });
                }
            }

            inner.progress()
        };

        self.shared.wake.notify_waiters();

        for (message, level) in messages {
            self.observer.on_log(&message, level);
        }
        self.observer.on_progress(progress.0, progress.1, progress.2);
    }
}

/// Settles a dispatched URL if its worker unwinds or is cancelled mid-page
struct DispatchGuard<'a> {
    context: &'a WorkerContext,
    pending: Option<(String, Origin)>,
}

impl<'a> DispatchGuard<'a> {
    fn new(context: &'a WorkerContext, item: &QueueItem) -> Self {
        Self {
            context,
            pending: Some((item.url.clone(), item.origin.clone())),
        }
    }

    fn disarm(&mut self) {
        self.pending = None;
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if let Some((url, origin)) = self.pending.take() {
            self.context.complete(
                url,
                origin,
                Outcome::Failed("page processing aborted".to_string()),
            );
        }
    }
}
