//! Per-page data extraction
//!
//! Every extraction module is toggled by the `[extraction]` configuration and
//! fails on its own: a broken custom selector leaves its field empty and
//! produces a warning, while the other fields are still filled in.

mod llm;
mod selectors;
mod xpath;

pub use llm::{apply_llm, OpenRouterSummarizer, Summarizer, DEFAULT_SYSTEM_PROMPT, NO_TEXT_PLACEHOLDER};
pub use selectors::{
    extract_css, extract_images, extract_links, extract_text, extract_title, extract_videos,
    select_first_text, LinkData,
};
pub use xpath::XPathQuery;

use crate::config::ExtractionConfig;
use crate::ExtractionError;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// Data extracted from one page; absent fields were not requested
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<LinkData>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<String>>,

    /// HTTP response headers of the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Result of the custom CSS selector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,

    /// Result of the custom XPath expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_xpath: Option<String>,

    /// LLM output for the page text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
}

/// The configured extraction modules, with custom selectors compiled once
#[derive(Debug, Clone)]
pub struct Extractors {
    config: ExtractionConfig,
    css_selector: Option<Result<Selector, ExtractionError>>,
    xpath: Option<Result<XPathQuery, ExtractionError>>,
}

impl Extractors {
    pub fn new(config: &ExtractionConfig) -> Self {
        let css_selector = (!config.css_selector.is_empty()).then(|| {
            Selector::parse(&config.css_selector).map_err(|e| ExtractionError::InvalidSelector {
                selector: config.css_selector.clone(),
                reason: format!("{:?}", e),
            })
        });

        let xpath = (!config.xpath_selector.is_empty())
            .then(|| XPathQuery::parse(&config.xpath_selector));

        Self {
            config: config.clone(),
            css_selector,
            xpath,
        }
    }

    /// Runs every enabled module against a parsed page
    ///
    /// # Arguments
    ///
    /// * `document` - The parsed page
    /// * `page_url` - URL used to resolve relative references
    /// * `html` - The raw page source
    /// * `headers` - The HTTP response headers
    ///
    /// # Returns
    ///
    /// The extracted data and one warning per module that failed
    pub fn extract(
        &self,
        document: &Html,
        page_url: &Url,
        html: &str,
        headers: &BTreeMap<String, String>,
    ) -> (ExtractedData, Vec<String>) {
        let mut data = ExtractedData::default();
        let mut warnings = Vec::new();

        if self.config.text {
            data.text = Some(extract_text(document));
        }
        if self.config.images {
            data.images = Some(extract_images(document, page_url));
        }
        if self.config.links {
            data.links = Some(extract_links(document, page_url));
        }
        if self.config.videos {
            data.videos = Some(extract_videos(document, page_url));
        }
        if self.config.headers {
            data.headers = Some(headers.clone());
        }
        if self.config.css {
            data.css = Some(extract_css(document));
        }
        if self.config.html {
            data.html = Some(html.to_string());
        }

        if let Some(compiled) = &self.css_selector {
            data.custom_css = Some(match compiled {
                Ok(selector) => select_first_text(document, selector),
                Err(e) => {
                    warnings.push(format!("{} on {}", e, page_url));
                    String::new()
                }
            });
        }

        if let Some(compiled) = &self.xpath {
            data.custom_xpath = Some(match compiled {
                Ok(query) => query.evaluate(document),
                Err(e) => {
                    warnings.push(format!("{} on {}", e, page_url));
                    String::new()
                }
            });
        }

        (data, warnings)
    }
}
