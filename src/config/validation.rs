use crate::config::types::{Config, CrawlerConfig, ExtractionConfig, LlmConfig, UserAgentConfig};
use crate::extract::XPathQuery;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_extraction_config(&config.extraction)?;
    validate_llm_config(&config.llm)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrent_requests < 1 || config.concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrent_requests must be between 1 and 100, got {}",
            config.concurrent_requests
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    validate_pattern("include_pattern", &config.include_pattern)?;
    validate_pattern("exclude_pattern", &config.exclude_pattern)?;

    Ok(())
}

/// Validates an optional regular expression
fn validate_pattern(name: &str, pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Ok(());
    }

    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {}", name, pattern, e)))
}

/// Validates the custom selectors
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if !config.css_selector.is_empty() {
        scraper::Selector::parse(&config.css_selector).map_err(|e| {
            ConfigError::InvalidPattern(format!(
                "css_selector '{}': {:?}",
                config.css_selector, e
            ))
        })?;
    }

    if !config.xpath_selector.is_empty() {
        XPathQuery::parse(&config.xpath_selector)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
    }

    Ok(())
}

/// Validates LLM configuration
fn validate_llm_config(config: &LlmConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.provider.is_empty() || config.model.is_empty() {
        return Err(ConfigError::Validation(
            "llm provider and model are required when llm is enabled".to_string(),
        ));
    }

    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid llm endpoint: {}", e)))?;

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name doubles as the robots.txt token: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if !config.contact_url.is_empty() {
        Url::parse(&config.contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}
