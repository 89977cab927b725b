//! Web-Harvest main entry point
//!
//! This is the command-line interface for the Web-Harvest crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use web_harvest::config::{load_config_with_hash, Config};
use web_harvest::output::{build_handlers, load_statistics, print_statistics, write_outputs};
use web_harvest::storage::open_storage;
use web_harvest::url::parse_http_url;
use web_harvest::CrawlEngine;

/// Web-Harvest: a polite site crawler and page extractor
///
/// Web-Harvest crawls a web site from a seed URL while respecting robots.txt,
/// follows links and sitemaps within the configured scope, and extracts the
/// configured data from every page.
#[derive(Parser, Debug)]
#[command(name = "web-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite site crawler and page extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL to start crawling from
    #[arg(value_name = "SEED")]
    seed: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest stored run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.seed.as_deref())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        let Some(seed) = cli.seed else {
            bail!("A seed URL is required to crawl");
        };
        handle_crawl(config, &config_hash, &seed).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_harvest=info,warn"),
            1 => EnvFilter::new("web_harvest=debug,info"),
            2 => EnvFilter::new("web_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, seed: Option<&str>) -> anyhow::Result<()> {
    let crawler = &config.crawler;

    println!("=== Web-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Max pages: {}", crawler.max_pages);
    println!("  Crawl delay: {}ms", crawler.crawl_delay_ms);
    println!("  Max retries: {}", crawler.max_retries);
    println!("  Concurrent requests: {}", crawler.concurrent_requests);
    println!("  Request timeout: {}ms", crawler.request_timeout_ms);
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    println!("  Follow external links: {}", crawler.follow_external);
    println!("  Use sitemap: {}", crawler.use_sitemap);
    if !crawler.include_pattern.is_empty() {
        println!("  Include pattern: {}", crawler.include_pattern);
    }
    if !crawler.exclude_pattern.is_empty() {
        println!("  Exclude pattern: {}", crawler.exclude_pattern);
    }

    let extraction = &config.extraction;
    let modules: Vec<&str> = [
        ("text", extraction.text),
        ("images", extraction.images),
        ("links", extraction.links),
        ("videos", extraction.videos),
        ("headers", extraction.headers),
        ("css", extraction.css),
        ("html", extraction.html),
    ]
    .into_iter()
    .filter_map(|(name, enabled)| enabled.then_some(name))
    .collect();

    println!("\nExtraction:");
    println!("  Modules: {}", modules.join(", "));
    if !extraction.css_selector.is_empty() {
        println!("  CSS selector: {}", extraction.css_selector);
    }
    if !extraction.xpath_selector.is_empty() {
        println!("  XPath selector: {}", extraction.xpath_selector);
    }
    if config.llm.enabled {
        println!("  LLM: {} / {}", config.llm.provider, config.llm.model);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);
    println!("  Results: {}", config.output.results_path);

    println!("\n✓ Configuration is valid");
    if let Some(seed) = seed {
        let url = parse_http_url(seed).with_context(|| format!("Invalid seed URL {}", seed))?;
        println!("✓ Would start crawling from {}", url);
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    if config.output.database_path.is_empty() {
        bail!("No database configured ([output] database-path is empty)");
    }

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    match load_statistics(&storage)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No crawl runs found in database"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, seed: &str) -> anyhow::Result<()> {
    let mut handlers =
        build_handlers(&config.output, config_hash).context("Failed to open outputs")?;

    let engine = Arc::new(CrawlEngine::new(config).context("Failed to build crawler")?);

    let ctrl_c_engine = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            ctrl_c_engine.stop();
        }
    });

    let summary = engine.start(seed).await.context("Crawl failed")?;

    tracing::info!(
        "Run {}: {} results, {} errors, {:.1}% success",
        summary.final_state,
        summary.stats.success_count,
        summary.stats.error_count,
        summary.stats.success_rate_percent
    );

    let failures = write_outputs(&mut handlers, &summary);
    if failures > 0 {
        bail!("{} output(s) could not be written", failures);
    }

    Ok(())
}
