//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end over real HTTP.

use web_harvest::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use web_harvest::crawler::Origin;
use web_harvest::output::{build_handlers, write_outputs};
use web_harvest::storage::{open_storage, Storage};
use web_harvest::{CrawlEngine, RunState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a fast, sequential-enough crawl
fn create_test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth: 2,
            max_pages: 50,
            crawl_delay_ms: 0,
            max_retries: 0,
            respect_robots: true,
            follow_external: false,
            use_sitemap: true,
            concurrent_requests: 2,
            request_timeout_ms: 5_000,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        ..Config::default()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(&body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let external = MockServer::start().await;
    let base = server.uri();

    // The external site must never be contacted
    Mock::given(method("GET"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&external)
        .await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="/page1">Page 1</a>
            <a href="page2">Page 2</a>
            <a href="/private/secret">Secret</a>
            <a href="{}/elsewhere">Elsewhere</a>
            </body></html>"#,
            external.uri()
        ),
    )
    .await;
    mount_page(
        &server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
        <a href="/">Home</a><a href="/page2">Page 2</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/page2",
        "<html><head><title>Page 2</title></head><body>End</body></html>".to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let engine = CrawlEngine::new(create_test_config()).unwrap();
    let summary = engine.start(&base).await.unwrap();

    assert_eq!(summary.final_state, RunState::Completed);
    assert_eq!(summary.results.len(), 3, "errors: {:?}", summary.errors);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.stats.success_rate_percent, 100.0);

    let seed = format!("{}/", base);
    let home = summary.results.iter().find(|r| r.url == seed).unwrap();
    assert_eq!(home.title, "Home");
    assert_eq!(home.depth, 0);
    assert_eq!(home.origin, Origin::Seed);

    let page1 = summary
        .results
        .iter()
        .find(|r| r.url == format!("{}/page1", base))
        .unwrap();
    assert_eq!(page1.depth, 1);
    assert_eq!(page1.origin, Origin::Page(seed.clone()));
    assert_eq!(page1.extracted_data.text.as_deref(), Some("Home Page 2"));

    assert!(summary
        .results
        .iter()
        .all(|r| !r.url.contains("/private/") && !r.url.starts_with(&external.uri())));

    let visited = engine.visited_urls();
    assert!(visited.contains(&format!("{}/private/secret", base)));
    assert_eq!(engine.state(), RunState::Completed);
}

#[tokio::test]
async fn test_sitemap_pages_are_crawled() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/hidden</loc></url>
  <url><loc>https://elsewhere.example/page</loc></url>
</urlset>"#
        )))
        .mount(&server)
        .await;

    mount_page(&server, "/", "<html><body>Seed</body></html>".to_string()).await;
    mount_page(
        &server,
        "/hidden",
        "<html><head><title>Hidden</title></head><body>Only in sitemap</body></html>".to_string(),
    )
    .await;

    let engine = CrawlEngine::new(create_test_config()).unwrap();
    let summary = engine.start(&base).await.unwrap();

    assert_eq!(summary.results.len(), 2);
    let hidden = summary
        .results
        .iter()
        .find(|r| r.url == format!("{}/hidden", base))
        .unwrap();
    assert_eq!(hidden.origin, Origin::Sitemap);
    assert_eq!(hidden.depth, 0);
}

#[tokio::test]
async fn test_http_errors_and_non_html() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/missing">Missing</a><a href="/report.pdf">Report</a></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.respect_robots = false;
    config.crawler.use_sitemap = false;

    let engine = CrawlEngine::new(config).unwrap();
    let summary = engine.start(&base).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].url, format!("{}/missing", base));
    assert!(summary.errors[0].message.contains("HTTP error: 404"));
    assert_eq!(summary.errors[0].origin, Origin::Page(format!("{}/", base)));

    // The PDF is processed without producing a result or an error
    assert_eq!(summary.stats.pages_processed, 3);
    assert!((summary.stats.success_rate_percent - 66.666).abs() < 0.01);
}

#[tokio::test]
async fn test_retry_recovers_from_server_error() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", "<html><body>Recovered</body></html>".to_string()).await;

    let mut config = create_test_config();
    config.crawler.max_retries = 1;
    config.crawler.respect_robots = false;
    config.crawler.use_sitemap = false;

    let engine = CrawlEngine::new(config).unwrap();
    let summary = engine.start(&base).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert!(summary.errors.is_empty());
    assert_eq!(
        summary.results[0].extracted_data.text.as_deref(),
        Some("Recovered")
    );
}

#[tokio::test]
async fn test_outputs_are_written() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        "<html><head><title>Only</title></head><body>x</body></html>".to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let output = OutputConfig {
        database_path: dir.path().join("harvest.db").to_string_lossy().into_owned(),
        summary_path: dir.path().join("summary.md").to_string_lossy().into_owned(),
        results_path: dir.path().join("results.json").to_string_lossy().into_owned(),
    };

    let mut config = create_test_config();
    config.crawler.respect_robots = false;
    config.crawler.use_sitemap = false;
    config.output = output.clone();

    let engine = CrawlEngine::new(config).unwrap();
    let summary = engine.start(&base).await.unwrap();

    let mut handlers = build_handlers(&output, "hash123").unwrap();
    assert_eq!(write_outputs(&mut handlers, &summary), 0);
    drop(handlers);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output.results_path).unwrap()).unwrap();
    assert_eq!(json["results"][0]["title"], "Only");
    assert_eq!(json["final_state"], "completed");

    let markdown = std::fs::read_to_string(&output.summary_path).unwrap();
    assert!(markdown.contains("| Only |"));

    let storage = open_storage(std::path::Path::new(&output.database_path)).unwrap();
    let run = storage.latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, "hash123");
    assert_eq!(storage.results_for_run(run.id).unwrap().len(), 1);
}
