//! Robots.txt parser implementation
//!
//! Only `User-agent`, `Disallow` and `Sitemap` directives are interpreted.
//! `Allow` lines and anything else are ignored.

use regex::Regex;

/// A single `Disallow` path
///
/// A URL path is disallowed by the rule when it equals the rule, when the
/// rule ends with `/` and prefixes the path, or when the rule contains `*`
/// and its anchored wildcard form matches the path.
#[derive(Debug, Clone)]
pub struct DisallowRule {
    path: String,
    wildcard: Option<Regex>,
}

impl DisallowRule {
    pub fn new(path: &str) -> Self {
        let wildcard = if path.contains('*') {
            compile_wildcard(path)
        } else {
            None
        };

        Self {
            path: path.to_string(),
            wildcard,
        }
    }

    /// The rule as written in robots.txt
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checks the rule against a URL path
    pub fn matches(&self, path: &str) -> bool {
        if self.path == path {
            return true;
        }

        if self.path.ends_with('/') && path.starts_with(&self.path) {
            return true;
        }

        match &self.wildcard {
            Some(regex) => regex.is_match(path),
            None => false,
        }
    }
}

/// Turns `/a/*.pdf` into `^/a/.*\.pdf$`
///
/// Everything but `*` is literal. A trailing `$` is the end anchor the pattern
/// gets anyway.
fn compile_wildcard(path: &str) -> Option<Regex> {
    let body = path.strip_suffix('$').unwrap_or(path);
    let pattern = body
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}$", pattern)).ok()
}

/// Parsed robots.txt data relevant to one crawler
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallowed: Vec<DisallowRule>,
    sitemaps: Vec<String>,
}

impl RobotsRules {
    /// An empty policy: everything is allowed
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `agent_token` - The crawler's lower-cased agent token
    ///
    /// Disallow lines are collected while the active `User-agent` is `*` or
    /// `agent_token`. Lines before any `User-agent` belong to `*`. Sitemap
    /// lines are collected wherever they appear.
    pub fn parse(content: &str, agent_token: &str) -> Self {
        let agent_token = agent_token.to_lowercase();
        let mut active_agent = "*".to_string();
        let mut rules = Self::default();

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    active_agent = value.to_lowercase();
                }
                "disallow" => {
                    if !value.is_empty() && (active_agent == "*" || active_agent == agent_token) {
                        rules.disallowed.push(DisallowRule::new(value));
                    }
                }
                "sitemap" => {
                    if !value.is_empty() && !rules.sitemaps.iter().any(|s| s == value) {
                        rules.sitemaps.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        rules
    }

    /// Checks a URL path against the collected rules
    pub fn is_path_allowed(&self, path: &str) -> bool {
        !self.disallowed.iter().any(|rule| rule.matches(path))
    }

    pub fn disallowed(&self) -> &[DisallowRule] {
        &self.disallowed
    }

    /// Sitemap URLs announced in the file, in order
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    pub fn is_empty(&self) -> bool {
        self.disallowed.is_empty()
    }
}
