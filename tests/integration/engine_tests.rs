//! Engine lifecycle and scheduling tests
//!
//! These tests drive `CrawlEngine` against an in-memory fetcher on a paused
//! tokio clock, so backoff and crawl delays complete instantly while the
//! virtual timestamps still reflect them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use web_harvest::config::{Config, CrawlerConfig};
use web_harvest::crawler::{FetchResponse, Fetcher, LogLevel, Observer, Origin};
use web_harvest::{CrawlEngine, FetchError, HarvestError, RunState};

const SITE: &str = "https://site.test";

struct Fixture {
    status: u16,
    content_type: &'static str,
    body: String,
    /// Attempts answered with 503 before the real response
    failures: u32,
}

/// Serves canned pages and records how it was called
#[derive(Default)]
struct FixtureFetcher {
    pages: HashMap<String, Fixture>,
    calls: Mutex<Vec<(String, Instant)>>,
    failures_served: Mutex<HashMap<String, u32>>,
    pending: AtomicUsize,
    max_pending: AtomicUsize,
    latency: Duration,
    /// When set, HTML page fetches wait for a permit
    gate: Option<Arc<Semaphore>>,
}

impl FixtureFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn page(mut self, path: &str, body: &str) -> Self {
        self.pages.insert(
            format!("{}{}", SITE, path),
            Fixture {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: body.to_string(),
                failures: 0,
            },
        );
        self
    }

    fn links(self, path: &str, targets: &[&str]) -> Self {
        let anchors: String = targets
            .iter()
            .map(|t| format!(r#"<a href="{}">{}</a>"#, t, t))
            .collect();
        let body = format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            path, anchors
        );
        self.page(path, &body)
    }

    fn file(mut self, path: &str, status: u16, content_type: &'static str, body: &str) -> Self {
        self.pages.insert(
            format!("{}{}", SITE, path),
            Fixture {
                status,
                content_type,
                body: body.to_string(),
                failures: 0,
            },
        );
        self
    }

    fn flaky(mut self, path: &str, failures: u32) -> Self {
        if let Some(fixture) = self.pages.get_mut(&format!("{}{}", SITE, path)) {
            fixture.failures = failures;
        }
        self
    }

    fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    fn call_count(&self, path: &str) -> usize {
        let url = format!("{}{}", SITE, path);
        self.calls.lock().iter().filter(|(u, _)| *u == url).count()
    }

    fn page_calls(&self) -> Vec<(String, Instant)> {
        self.calls
            .lock()
            .iter()
            .filter(|(url, _)| !url.ends_with("robots.txt") && !url.contains("sitemap"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        self.calls.lock().push((url.to_string(), Instant::now()));

        let fixture = self.pages.get(url);
        let is_page = fixture.map_or(false, |f| f.content_type.starts_with("text/html"));

        let now_pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_pending.fetch_max(now_pending, Ordering::SeqCst);

        if is_page {
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.pending.fetch_sub(1, Ordering::SeqCst);

        let Some(fixture) = fixture else {
            return Ok(response(url, 404, "text/plain", "not found"));
        };

        {
            let mut served = self.failures_served.lock();
            let count = served.entry(url.to_string()).or_default();
            if *count < fixture.failures {
                *count += 1;
                return Ok(response(url, 503, "text/plain", "unavailable"));
            }
        }

        Ok(response(url, fixture.status, fixture.content_type, &fixture.body))
    }
}

fn response(url: &str, status: u16, content_type: &str, body: &str) -> FetchResponse {
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), content_type.to_string());
    FetchResponse {
        url: url.to_string(),
        status,
        headers,
        body: body.to_string(),
    }
}

#[derive(Default)]
struct RecordingObserver {
    logs: Mutex<Vec<(String, LogLevel)>>,
    progress: Mutex<Vec<(usize, usize, String)>>,
}

impl RecordingObserver {
    fn has_log(&self, needle: &str, level: LogLevel) -> bool {
        self.logs
            .lock()
            .iter()
            .any(|(message, l)| *l == level && message.contains(needle))
    }
}

impl Observer for RecordingObserver {
    fn on_log(&self, message: &str, level: LogLevel) {
        self.logs.lock().push((message.to_string(), level));
    }

    fn on_progress(&self, processed: usize, total: usize, status: &str) {
        self.progress
            .lock()
            .push((processed, total, status.to_string()));
    }
}

fn create_test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth: 3,
            max_pages: 100,
            crawl_delay_ms: 0,
            max_retries: 0,
            respect_robots: false,
            use_sitemap: false,
            concurrent_requests: 2,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    }
}

fn engine_with(
    config: Config,
    fetcher: &Arc<FixtureFetcher>,
) -> (Arc<CrawlEngine>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let engine = CrawlEngine::with_fetcher(config, fetcher.clone()).with_observer(observer.clone());
    (Arc::new(engine), observer)
}

fn seed() -> String {
    format!("{}/", SITE)
}

fn url(path: &str) -> String {
    format!("{}{}", SITE, path)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Seed linking to /a, /b and /c, each a leaf
fn small_site() -> FixtureFetcher {
    FixtureFetcher::new()
        .links("/", &["/a", "/b", "/c"])
        .links("/a", &[])
        .links("/b", &[])
        .links("/c", &[])
}

#[tokio::test(start_paused = true)]
async fn test_crawls_whole_site() {
    let fetcher = Arc::new(small_site());
    let (engine, observer) = engine_with(create_test_config(), &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.final_state, RunState::Completed);
    assert_eq!(summary.seed, seed());
    assert_eq!(summary.results.len(), 4);
    assert_eq!(summary.stats.pages_processed, 4);
    assert_eq!(summary.stats.total_estimate, 4);
    assert_eq!(summary.stats.queue_remaining, 0);
    assert_eq!(summary.stats.success_rate_percent, 100.0);

    let last = observer.progress.lock().last().cloned().unwrap();
    assert_eq!(last, (4, 4, "Completed".to_string()));
    assert!(observer.has_log("Starting crawl from https://site.test/", LogLevel::Info));
}

#[tokio::test(start_paused = true)]
async fn test_visited_urls_are_unique() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/a", "/b", "/a", "/"])
            .links("/a", &["/", "/b"])
            .links("/b", &["/a", "/"]),
    );
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    let visited = engine.visited_urls();
    let unique: HashSet<&String> = visited.iter().collect();
    assert_eq!(unique.len(), visited.len());

    for path in ["/", "/a", "/b"] {
        assert_eq!(fetcher.call_count(path), 1, "{} fetched more than once", path);
    }
    assert_eq!(summary.results.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_max_depth_zero_fetches_only_seed() {
    let fetcher = Arc::new(small_site());
    let mut config = create_test_config();
    config.crawler.max_depth = 0;
    let (engine, _) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(fetcher.calls(), vec![seed()]);
}

#[tokio::test(start_paused = true)]
async fn test_depth_limit_is_respected() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/one"])
            .links("/one", &["/two"])
            .links("/two", &["/three"])
            .links("/three", &[]),
    );
    let mut config = create_test_config();
    config.crawler.max_depth = 2;
    let (engine, _) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    let depths: HashMap<String, u32> = summary
        .results
        .iter()
        .map(|r| (r.url.clone(), r.depth))
        .collect();
    assert_eq!(depths.len(), 3);
    assert_eq!(depths[&url("/two")], 2);
    assert!(!fetcher.calls().contains(&url("/three")));
}

#[tokio::test(start_paused = true)]
async fn test_page_cap_limits_fetches() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/1", "/2", "/3", "/4", "/5"])
            .links("/1", &[])
            .links("/2", &[])
            .links("/3", &[])
            .links("/4", &[])
            .links("/5", &[]),
    );
    let mut config = create_test_config();
    config.crawler.max_pages = 3;
    let (engine, _) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.final_state, RunState::Completed);
    assert_eq!(summary.results.len(), 3);
    assert_eq!(fetcher.page_calls().len(), 3);
    assert_eq!(summary.stats.queue_remaining, 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/1", "/2", "/3", "/4", "/5", "/6"])
            .links("/1", &[])
            .links("/2", &[])
            .links("/3", &[])
            .links("/4", &[])
            .links("/5", &[])
            .links("/6", &[])
            .latency(Duration::from_millis(50)),
    );
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.results.len(), 7);
    assert_eq!(fetcher.max_pending.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_crawl_delay_spaces_fetches() {
    let fetcher = Arc::new(small_site());
    let mut config = create_test_config();
    config.crawler.concurrent_requests = 1;
    config.crawler.crawl_delay_ms = 1000;
    let (engine, _) = engine_with(config, &fetcher);

    let started = Instant::now();
    engine.start(SITE).await.unwrap();

    let calls = fetcher.page_calls();
    assert_eq!(calls.len(), 4);
    // The first fetch of the run is not delayed
    assert!(calls[0].1 - started < Duration::from_millis(1000));
    for pair in calls.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(1000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_robots_disallow_is_enforced() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .file(
                "/robots.txt",
                200,
                "text/plain",
                "User-agent: *\nDisallow: /private/\nDisallow: /*.json$\n",
            )
            .links("/", &["/private/a", "/public", "/data.json"])
            .links("/public", &[])
            .links("/private/a", &[]),
    );
    let mut config = create_test_config();
    config.crawler.respect_robots = true;
    let (engine, observer) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    let calls = fetcher.calls();
    assert_eq!(calls[0], url("/robots.txt"));
    assert!(!calls.contains(&url("/private/a")));
    assert!(!calls.contains(&url("/data.json")));
    assert_eq!(summary.results.len(), 2);
    assert!(summary.errors.is_empty());
    assert!(observer.has_log(
        "Skipping https://site.test/private/a (disallowed by robots.txt)",
        LogLevel::Info
    ));
}

#[tokio::test(start_paused = true)]
async fn test_robots_ignored_when_disabled() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .file("/robots.txt", 200, "text/plain", "User-agent: *\nDisallow: /\n")
            .links("/", &[]),
    );
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(fetcher.calls(), vec![seed()]);
}

#[tokio::test(start_paused = true)]
async fn test_external_links_out_of_scope() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["https://other.test/x", "/local"])
            .links("/local", &[]),
    );
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.results.len(), 2);
    assert!(fetcher.calls().iter().all(|u| u.starts_with(SITE)));
}

#[tokio::test(start_paused = true)]
async fn test_include_and_exclude_patterns() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/docs/a", "/docs/b.pdf", "/blog/c"])
            .links("/docs/a", &[])
            .links("/blog/c", &[]),
    );
    let mut config = create_test_config();
    config.crawler.include_pattern = r"^https://site\.test/(docs/.*)?$".to_string();
    config.crawler.exclude_pattern = r"\.pdf$".to_string();
    let (engine, _) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    let urls: HashSet<String> = summary.results.iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls, HashSet::from([seed(), url("/docs/a")]));
}

#[tokio::test(start_paused = true)]
async fn test_retries_then_error() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/flaky", "/down"])
            .links("/flaky", &[])
            .flaky("/flaky", 2)
            .file("/down", 500, "text/html", "boom"),
    );
    let mut config = create_test_config();
    config.crawler.max_retries = 2;
    let (engine, observer) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(fetcher.call_count("/flaky"), 3);
    assert!(summary.results.iter().any(|r| r.url == url("/flaky")));

    assert_eq!(fetcher.call_count("/down"), 3);
    assert_eq!(summary.errors.len(), 1);
    let error = &summary.errors[0];
    assert_eq!(error.url, url("/down"));
    assert_eq!(error.origin, Origin::Page(seed()));
    assert!(error.message.contains("after 2 retries"));
    assert!(error.message.contains("HTTP error: 500"));
    assert!(observer.has_log("Error processing https://site.test/down", LogLevel::Error));
}

#[tokio::test(start_paused = true)]
async fn test_non_html_is_skipped_without_error() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .links("/", &["/image.png"])
            .file("/image.png", 200, "image/png", "\u{89}PNG"),
    );
    let (engine, observer) = engine_with(create_test_config(), &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.stats.pages_processed, 2);
    assert!(engine.visited_urls().contains(&url("/image.png")));
    assert!(observer.has_log("not HTML", LogLevel::Info));
}

#[tokio::test(start_paused = true)]
async fn test_sitemap_seeds_frontier() {
    let fetcher = Arc::new(
        FixtureFetcher::new()
            .file(
                "/sitemap.xml",
                200,
                "application/xml",
                r#"<urlset><url><loc>https://site.test/from-sitemap</loc></url>
                   <url><loc>https://site.test/</loc></url></urlset>"#,
            )
            .links("/", &[])
            .links("/from-sitemap", &[]),
    );
    let mut config = create_test_config();
    config.crawler.use_sitemap = true;
    config.crawler.concurrent_requests = 1;
    let (engine, _) = engine_with(config, &fetcher);

    let summary = engine.start(SITE).await.unwrap();

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.results[0].url, url("/from-sitemap"));
    assert_eq!(summary.results[0].origin, Origin::Sitemap);
    // The seed was already queued from the sitemap
    assert_eq!(summary.results[1].url, seed());
    assert_eq!(summary.results[1].origin, Origin::Sitemap);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(small_site().gated(gate.clone()));
    let mut config = create_test_config();
    config.crawler.concurrent_requests = 1;
    let (engine, observer) = engine_with(config, &fetcher);

    let run = tokio::spawn({
        let engine = engine.clone();
        async move { engine.start(SITE).await }
    });

    wait_until(|| fetcher.pending.load(Ordering::SeqCst) == 1).await;
    assert!(engine.pause());
    assert!(!engine.pause());
    assert_eq!(engine.state(), RunState::Paused);

    gate.add_permits(100);
    wait_until(|| engine.progress().pages_processed == 1).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Nothing new was dispatched while paused
    assert_eq!(fetcher.page_calls().len(), 1);
    let progress = engine.progress();
    assert_eq!(progress.state, RunState::Paused);
    assert_eq!(progress.queue_depth, 3);
    assert_eq!(progress.in_flight, 0);
    assert!(observer.has_log("Crawler paused", LogLevel::Info));

    assert!(engine.resume());
    let summary = run.await.unwrap().unwrap();

    assert_eq!(summary.final_state, RunState::Completed);
    assert_eq!(summary.results.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_finishes_in_flight_page() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(small_site().gated(gate.clone()));
    let mut config = create_test_config();
    config.crawler.concurrent_requests = 1;
    let (engine, observer) = engine_with(config, &fetcher);

    let run = tokio::spawn({
        let engine = engine.clone();
        async move { engine.start(SITE).await }
    });

    wait_until(|| fetcher.pending.load(Ordering::SeqCst) == 1).await;
    assert!(engine.stop());
    gate.add_permits(100);

    let summary = run.await.unwrap().unwrap();

    assert_eq!(summary.final_state, RunState::Stopped);
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.stats.queue_remaining, 3);
    assert_eq!(engine.state(), RunState::Stopped);
    assert!(!engine.stop());
    assert_eq!(
        observer.progress.lock().last().map(|p| p.2.clone()),
        Some("Stopped".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_while_stopped_run_drains_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(small_site().gated(gate.clone()));
    let mut config = create_test_config();
    config.crawler.concurrent_requests = 1;
    let (engine, _) = engine_with(config, &fetcher);

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.start(SITE).await }
    });

    wait_until(|| fetcher.pending.load(Ordering::SeqCst) == 1).await;
    assert!(engine.stop());

    let during_drain = engine.start(SITE).await;
    assert!(matches!(during_drain, Err(HarvestError::AlreadyRunning)));
    assert_eq!(engine.state(), RunState::Stopped);

    gate.add_permits(100);
    let stopped = first.await.unwrap().unwrap();

    assert_eq!(stopped.final_state, RunState::Stopped);
    assert_eq!(stopped.results.len(), 1);
    assert_eq!(stopped.results[0].url, seed());
    assert_eq!(fetcher.call_count("/"), 1);

    let restarted = engine.start(SITE).await.unwrap();
    assert_eq!(restarted.final_state, RunState::Completed);
    assert_eq!(restarted.results.len(), 4);
    assert_eq!(fetcher.call_count("/"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_while_running_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(small_site().gated(gate.clone()));
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    let run = tokio::spawn({
        let engine = engine.clone();
        async move { engine.start(SITE).await }
    });

    wait_until(|| fetcher.pending.load(Ordering::SeqCst) == 1).await;
    let second = engine.start("https://elsewhere.test/").await;
    assert!(matches!(second, Err(HarvestError::AlreadyRunning)));
    assert_eq!(engine.state(), RunState::Running);

    gate.add_permits(100);
    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.seed, seed());
    assert_eq!(summary.results.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_seed_is_rejected() {
    let fetcher = Arc::new(small_site());
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    for bad in ["not a url", "ftp://site.test/", "mailto:someone@site.test"] {
        let result = engine.start(bad).await;
        assert!(
            matches!(result, Err(HarvestError::InvalidSeed { .. })),
            "{} accepted",
            bad
        );
    }

    assert_eq!(engine.state(), RunState::Idle);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_completion() {
    let fetcher = Arc::new(small_site());
    let (engine, _) = engine_with(create_test_config(), &fetcher);

    let first = engine.start(SITE).await.unwrap();
    let second = engine.start(SITE).await.unwrap();

    assert_eq!(first.results.len(), 4);
    assert_eq!(second.results.len(), 4);
    assert_eq!(second.final_state, RunState::Completed);
    assert_eq!(engine.visited_urls().len(), 4);
    assert_eq!(fetcher.call_count("/"), 2);
}
