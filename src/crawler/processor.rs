//! Page processing
//!
//! Turns a fetched HTML document into a result record plus the follow-up
//! links worth queueing. This module handles:
//! - Parsing the page and reading its title
//! - Link discovery (`<a href>` only, resolved against the page URL)
//! - Running the configured extraction modules and the optional LLM step

use crate::config::Config;
use crate::crawler::fetcher::FetchResponse;
use crate::crawler::frontier::{Origin, QueueItem};
use crate::crawler::result::CrawlResult;
use crate::extract::{apply_llm, extract_title, ExtractedData, Extractors, Summarizer};
use crate::url::{is_same_origin, resolve_link};
use crate::HarvestError;
use chrono::Utc;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Output of processing one page
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub result: CrawlResult,

    /// Links to offer to the frontier, in document order
    pub discovered: Vec<QueueItem>,

    /// Extraction modules that failed on this page
    pub warnings: Vec<String>,
}

/// Everything read synchronously from the parsed document
struct ParsedPage {
    title: String,
    links: Vec<String>,
    data: ExtractedData,
    warnings: Vec<String>,
}

pub struct PageProcessor {
    config: Arc<Config>,
    extractors: Extractors,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl PageProcessor {
    /// Creates a processor; `summarizer` is only used when `[llm] enabled` is set
    pub fn new(config: Arc<Config>, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        let extractors = Extractors::new(&config.extraction);
        Self {
            config,
            extractors,
            summarizer,
        }
    }

    /// Processes a fetched page
    ///
    /// # Arguments
    ///
    /// * `item` - The frontier item that was fetched
    /// * `response` - The successful HTML response
    /// * `base_origin` - Origin of the seed, for external-link filtering
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessedPage)` - The result record and discovered links
    /// * `Err(HarvestError)` - The page URL itself could not be parsed
    pub async fn process(
        &self,
        item: &QueueItem,
        response: &FetchResponse,
        base_origin: &str,
    ) -> Result<ProcessedPage, HarvestError> {
        let page_url = Url::parse(&item.url)?;
        let follow_links = item.depth < self.config.crawler.max_depth;

        // Html is !Send; keep it inside this block so nothing holds it across an await
        let parsed = {
            let document = Html::parse_document(&response.body);
            let title = extract_title(&document).unwrap_or_default();
            let links = if follow_links {
                self.discover_links(&document, &page_url, base_origin)
            } else {
                Vec::new()
            };
            let (data, warnings) =
                self.extractors
                    .extract(&document, &page_url, &response.body, &response.headers);

            ParsedPage {
                title,
                links,
                data,
                warnings,
            }
        };

        let ParsedPage {
            title,
            links,
            mut data,
            mut warnings,
        } = parsed;

        if self.config.llm.enabled {
            if let Some(summarizer) = &self.summarizer {
                let (output, warning) =
                    apply_llm(summarizer.as_ref(), data.text.as_deref(), &self.config.llm).await;
                data.llm = Some(output);
                warnings.extend(warning);
            }
        }

        let discovered = links
            .into_iter()
            .map(|url| QueueItem::new(url, item.depth + 1, Origin::Page(item.url.clone())))
            .collect();

        let result = CrawlResult {
            url: item.url.clone(),
            depth: item.depth,
            origin: item.origin.clone(),
            title,
            raw_document: response.body.clone(),
            extracted_data: data,
            timestamp: Utc::now(),
        };

        Ok(ProcessedPage {
            result,
            discovered,
            warnings,
        })
    }

    /// Collects crawlable links, de-duplicated within the page
    fn discover_links(&self, document: &Html, page_url: &Url, base_origin: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(absolute) = resolve_link(href, page_url) else {
                continue;
            };
            if !self.config.crawler.follow_external && !is_same_origin(&absolute, base_origin) {
                continue;
            }
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }

        links
    }
}
