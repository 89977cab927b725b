//! Sitemap discovery and parsing
//!
//! Handles both `<urlset>` documents and `<sitemapindex>` documents, and
//! tolerates documents that mix the two.

use crate::crawler::{Fetcher, LogLevel, Observer};
use crate::url::{is_same_origin, parse_http_url};
use crate::PolicyError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::time::Duration;

/// How deep sitemap indexes may nest below the sitemap that was requested
pub const MAX_SITEMAP_NESTING: u32 = 3;

/// The `<loc>` entries of one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<url><loc>` entries
    pub pages: Vec<String>,
    /// `<sitemap><loc>` entries
    pub children: Vec<String>,
}

/// Parses sitemap XML
///
/// Element names are compared without namespace prefixes. Parsing stops at the
/// first malformed token; whatever was read before it is kept.
pub fn parse_sitemap(xml: &str) -> SitemapDocument {
    let mut document = SitemapDocument::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    // Name of the <url>/<sitemap> element we are inside, if any
    let mut entry: Option<String> = None;
    let mut in_loc = false;
    let mut loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                match name.as_str() {
                    "url" | "sitemap" => entry = Some(name),
                    "loc" if entry.is_some() => {
                        in_loc = true;
                        loc.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) if in_loc => {
                if let Ok(text) = e.unescape() {
                    loc.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) if in_loc => {
                loc.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                match name.as_str() {
                    "loc" if in_loc => {
                        in_loc = false;
                        let value = loc.trim().to_string();
                        if !value.is_empty() {
                            match entry.as_deref() {
                                Some("url") => document.pages.push(value),
                                Some("sitemap") => document.children.push(value),
                                _ => {}
                            }
                        }
                    }
                    "url" | "sitemap" => entry = None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    document
}

/// Collects page URLs from one or more sitemaps of a site
pub struct SitemapLoader<'a> {
    fetcher: &'a dyn Fetcher,
    observer: &'a dyn Observer,
    timeout: Duration,
    base_origin: String,
    follow_external: bool,
    fetched: HashSet<String>,
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl<'a> SitemapLoader<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        observer: &'a dyn Observer,
        timeout: Duration,
        base_origin: &str,
        follow_external: bool,
    ) -> Self {
        Self {
            fetcher,
            observer,
            timeout,
            base_origin: base_origin.to_string(),
            follow_external,
            fetched: HashSet::new(),
            seen: HashSet::new(),
            urls: Vec::new(),
        }
    }

    /// Loads `{origin}/sitemap.xml`, falling back to `{origin}/sitemap_index.xml`
    pub async fn load_default(&mut self) {
        let sitemap_url = format!("{}/sitemap.xml", self.base_origin);
        let Err(e) = self.load_from(&sitemap_url).await else {
            return;
        };
        self.observer
            .on_log(&format!("Error fetching sitemap: {}", e), LogLevel::Warning);

        let index_url = format!("{}/sitemap_index.xml", self.base_origin);
        self.observer.on_log(
            &format!("Trying sitemap index at {}", index_url),
            LogLevel::Info,
        );
        if let Err(e) = self.load_from(&index_url).await {
            self.observer
                .on_log(&format!("Error fetching sitemap index: {}", e), LogLevel::Warning);
        }
    }

    /// Loads one sitemap and every sitemap it references
    ///
    /// Only a failure of `sitemap_url` itself is returned; failing children are
    /// logged and skipped. A sitemap that was already fetched counts as loaded.
    pub async fn load_from(&mut self, sitemap_url: &str) -> Result<(), PolicyError> {
        let mut pending = vec![(sitemap_url.to_string(), 0u32)];
        let mut root_result = Ok(());

        while let Some((url, nesting)) = pending.pop() {
            if !self.fetched.insert(url.clone()) {
                continue;
            }

            self.observer
                .on_log(&format!("Fetching sitemap from {}", url), LogLevel::Info);

            let document = match self.fetch_document(&url).await {
                Ok(document) => document,
                Err(e) => {
                    if nesting == 0 {
                        root_result = Err(e);
                    } else {
                        self.observer.on_log(
                            &format!("Error fetching sitemap from index: {}", e),
                            LogLevel::Warning,
                        );
                    }
                    continue;
                }
            };

            let added = self.accept_pages(&document.pages);
            self.observer.on_log(
                &format!(
                    "Extracted {} URLs from sitemap {} ({} kept)",
                    document.pages.len(),
                    url,
                    added
                ),
                LogLevel::Info,
            );

            if nesting >= MAX_SITEMAP_NESTING {
                if !document.children.is_empty() {
                    self.observer.on_log(
                        &format!("Ignoring sitemaps nested below {}", url),
                        LogLevel::Warning,
                    );
                }
                continue;
            }

            // Reverse so children are fetched in document order
            for child in document.children.into_iter().rev() {
                self.observer
                    .on_log(&format!("Found sitemap in index: {}", child), LogLevel::Info);
                pending.push((child, nesting + 1));
            }
        }

        root_result
    }

    async fn fetch_document(&self, url: &str) -> Result<SitemapDocument, PolicyError> {
        let response = self
            .fetcher
            .fetch(url, self.timeout)
            .await
            .map_err(|e| PolicyError::Sitemap {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(PolicyError::Sitemap {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status),
            });
        }

        Ok(parse_sitemap(&response.body))
    }

    /// Filters page entries the way discovered links are filtered
    fn accept_pages(&mut self, pages: &[String]) -> usize {
        let mut added = 0;

        for page in pages {
            let url = match parse_http_url(page) {
                Ok(url) => url.to_string(),
                Err(_) => {
                    self.observer
                        .on_log(&format!("Invalid URL in sitemap: {}", page), LogLevel::Warning);
                    continue;
                }
            };

            if !self.follow_external && !is_same_origin(&url, &self.base_origin) {
                continue;
            }

            if self.seen.insert(url.clone()) {
                self.urls.push(url);
                added += 1;
            }
        }

        added
    }

    /// Accepted page URLs in discovery order
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}
