//! Admission control for the crawl
//!
//! This module decides whether a URL may be fetched. It combines the
//! robots.txt rules of the seed's site, the configured depth/origin/pattern
//! scope, and the sitemap URLs used to seed the frontier.

mod robots;
mod scope;
mod sitemap;

pub use robots::{DisallowRule, RobotsRules};
pub use scope::ScopeRules;
pub use sitemap::{parse_sitemap, SitemapDocument, SitemapLoader, MAX_SITEMAP_NESTING};

use crate::config::Config;
use crate::crawler::{Fetcher, LogLevel, Observer};
use crate::url::path_of;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Read-only admission policy for one run
#[derive(Debug, Clone)]
pub struct PolicyGate {
    base_origin: String,
    robots: RobotsRules,
    scope: ScopeRules,
    sitemap_urls: Vec<String>,
}

impl PolicyGate {
    pub fn new(
        base_origin: &str,
        robots: RobotsRules,
        scope: ScopeRules,
        sitemap_urls: Vec<String>,
    ) -> Self {
        Self {
            base_origin: base_origin.to_string(),
            robots,
            scope,
            sitemap_urls,
        }
    }

    /// Builds the policy for a crawl starting at `seed`
    ///
    /// Fetches robots.txt when `respect-robots` is set and sitemaps when
    /// `use-sitemap` is set. Sitemaps announced in robots.txt are loaded
    /// before `{origin}/sitemap.xml`. No failure here is fatal: an
    /// unavailable robots.txt allows everything and unavailable sitemaps
    /// contribute no URLs.
    pub async fn load(
        seed: &Url,
        config: &Config,
        fetcher: &dyn Fetcher,
        observer: &dyn Observer,
    ) -> Self {
        let base_origin = seed.origin().ascii_serialization();
        let timeout = Duration::from_millis(config.crawler.request_timeout_ms);

        let scope = ScopeRules::from_config(&config.crawler);
        if let Some(pattern) = scope.broken_pattern() {
            observer.on_log(
                &format!("Invalid {}; no URL is in scope", pattern),
                LogLevel::Warning,
            );
        }

        let robots = if config.crawler.respect_robots {
            load_robots(
                &base_origin,
                &config.user_agent.robots_token(),
                fetcher,
                observer,
                timeout,
            )
            .await
        } else {
            RobotsRules::allow_all()
        };

        let mut sitemap_urls = Vec::new();
        if config.crawler.use_sitemap {
            let mut loader = SitemapLoader::new(
                fetcher,
                observer,
                timeout,
                &base_origin,
                config.crawler.follow_external,
            );

            for announced in robots.sitemaps() {
                observer.on_log(
                    &format!("Found sitemap in robots.txt: {}", announced),
                    LogLevel::Info,
                );
                if let Err(e) = loader.load_from(announced).await {
                    observer.on_log(
                        &format!("Error fetching sitemap from robots.txt: {}", e),
                        LogLevel::Warning,
                    );
                }
            }

            loader.load_default().await;
            sitemap_urls = loader.into_urls();

            if !sitemap_urls.is_empty() {
                observer.on_log(
                    &format!("Found {} URLs in sitemap", sitemap_urls.len()),
                    LogLevel::Info,
                );
            }
        }

        Self {
            base_origin,
            robots,
            scope,
            sitemap_urls,
        }
    }

    /// Checks a URL against robots.txt
    ///
    /// Everything is allowed when there are no disallow rules. Otherwise a URL
    /// that does not parse is refused.
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.robots.is_empty() {
            return true;
        }

        match path_of(url) {
            Some(path) => self.robots.is_path_allowed(&path),
            None => false,
        }
    }

    /// Checks depth, visited state, origin and patterns
    pub fn in_scope(&self, url: &str, depth: u32, visited: &HashSet<String>) -> bool {
        self.scope.in_scope(url, depth, visited, &self.base_origin)
    }

    /// Scheme, host and port of the seed
    pub fn base_origin(&self) -> &str {
        &self.base_origin
    }

    pub fn robots(&self) -> &RobotsRules {
        &self.robots
    }

    /// Page URLs gathered from sitemaps, in discovery order
    pub fn sitemap_urls(&self) -> &[String] {
        &self.sitemap_urls
    }
}

/// Fetches and parses `{origin}/robots.txt`
///
/// Fails open: a transport error or a non-success status yields an empty
/// policy and a warning.
pub async fn load_robots(
    base_origin: &str,
    agent_token: &str,
    fetcher: &dyn Fetcher,
    observer: &dyn Observer,
    timeout: Duration,
) -> RobotsRules {
    let robots_url = format!("{}/robots.txt", base_origin);
    observer.on_log(
        &format!("Fetching robots.txt from {}", robots_url),
        LogLevel::Info,
    );

    let response = match fetcher.fetch(&robots_url, timeout).await {
        Ok(response) => response,
        Err(e) => {
            observer.on_log(
                &format!("Error fetching robots.txt: {}", e),
                LogLevel::Warning,
            );
            return RobotsRules::allow_all();
        }
    };

    if !response.is_success() {
        observer.on_log(
            &format!(
                "No robots.txt found or unable to fetch ({})",
                response.status
            ),
            LogLevel::Warning,
        );
        return RobotsRules::allow_all();
    }

    let rules = RobotsRules::parse(&response.body, agent_token);
    observer.on_log(
        &format!(
            "Parsed robots.txt: {} disallowed paths",
            rules.disallowed().len()
        ),
        LogLevel::Info,
    );
    rules
}
