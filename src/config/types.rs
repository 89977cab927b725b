use serde::Deserialize;

/// Main configuration structure for Web-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed (the seed is depth 0)
    pub max_depth: u32,

    /// Maximum number of pages fetched in one run
    pub max_pages: u32,

    /// Minimum spacing between successive fetches of a worker (milliseconds)
    pub crawl_delay_ms: u64,

    /// Retries after the first failed attempt of a fetch
    pub max_retries: u32,

    /// Honor robots.txt Disallow rules
    pub respect_robots: bool,

    /// Follow links that leave the seed's origin
    pub follow_external: bool,

    /// Seed the frontier from sitemap.xml / sitemap_index.xml
    pub use_sitemap: bool,

    /// Regex a URL must match to be crawled (empty = no filter)
    pub include_pattern: String,

    /// Regex a URL must not match to be crawled (empty = no filter)
    pub exclude_pattern: String,

    /// Number of concurrent fetch workers
    pub concurrent_requests: u32,

    /// Hard cutoff for a single fetch attempt (milliseconds)
    pub request_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            crawl_delay_ms: 1000,
            max_retries: 3,
            respect_robots: true,
            follow_external: false,
            use_sitemap: true,
            include_pattern: String::new(),
            exclude_pattern: String::new(),
            concurrent_requests: 3,
            request_timeout_ms: 30_000,
        }
    }
}

/// Which extraction modules run on every page
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    pub text: bool,
    pub images: bool,
    pub links: bool,
    pub videos: bool,
    /// Include the HTTP response headers of the page
    pub headers: bool,
    pub css: bool,
    pub html: bool,
    /// Custom CSS selector (empty = disabled)
    pub css_selector: String,
    /// Custom XPath expression (empty = disabled)
    pub xpath_selector: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            text: true,
            images: false,
            links: false,
            videos: false,
            headers: false,
            css: false,
            html: false,
            css_selector: String::new(),
            xpath_selector: String::new(),
        }
    }
}

/// LLM post-processing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    pub prompt: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub endpoint: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openrouter".to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
            prompt: String::new(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt agent token
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler (optional)
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "WebScraperBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: String::new(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        if self.contact_url.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, self.contact_url
            )
        }
    }

    /// The token matched against robots.txt `User-agent` lines
    pub fn robots_token(&self) -> String {
        self.crawler_name.to_lowercase()
    }
}

/// Output configuration; empty paths disable the corresponding sink
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Path to the markdown summary file
    pub summary_path: String,

    /// Path to the JSON results file
    pub results_path: String,
}
