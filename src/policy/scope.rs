use crate::config::CrawlerConfig;
use crate::url::is_same_origin;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

/// Depth, origin and pattern rules deciding whether a URL is worth crawling
#[derive(Debug, Clone)]
pub struct ScopeRules {
    max_depth: u32,
    follow_external: bool,
    include: Option<Regex>,
    exclude: Option<Regex>,
    /// Set when a configured pattern failed to compile; nothing is in scope then
    broken_pattern: Option<String>,
}

impl ScopeRules {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        let mut broken_pattern = None;

        let mut compile = |name: &str, pattern: &str| -> Option<Regex> {
            if pattern.is_empty() {
                return None;
            }
            match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Invalid {} '{}': {}", name, pattern, e);
                    broken_pattern = Some(format!("{} '{}': {}", name, pattern, e));
                    None
                }
            }
        };

        let include = compile("include pattern", &config.include_pattern);
        let exclude = compile("exclude pattern", &config.exclude_pattern);

        Self {
            max_depth: config.max_depth,
            follow_external: config.follow_external,
            include,
            exclude,
            broken_pattern,
        }
    }

    /// Describes the pattern that failed to compile, if any
    pub fn broken_pattern(&self) -> Option<&str> {
        self.broken_pattern.as_deref()
    }

    /// Checks whether a URL at `depth` may be crawled
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL
    /// * `depth` - Link distance from the seed
    /// * `visited` - URLs already finished in this run
    /// * `base_origin` - Origin of the seed
    pub fn in_scope(
        &self,
        url: &str,
        depth: u32,
        visited: &HashSet<String>,
        base_origin: &str,
    ) -> bool {
        if self.broken_pattern.is_some() {
            return false;
        }

        if depth > self.max_depth {
            return false;
        }

        if visited.contains(url) {
            return false;
        }

        if ::url::Url::parse(url).is_err() {
            return false;
        }

        if !self.follow_external && !is_same_origin(url, base_origin) {
            return false;
        }

        if let Some(include) = &self.include {
            if !include.is_match(url) {
                return false;
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(url) {
                return false;
            }
        }

        true
    }
}
