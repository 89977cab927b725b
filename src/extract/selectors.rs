//! Selector-based extractors
//!
//! Each function reads one kind of data out of a parsed document. URLs are
//! resolved against the page URL; values that cannot be resolved are skipped.

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

/// A hyperlink as found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkData {
    pub text: String,
    pub href: String,
}

/// Visible text of the body, whitespace collapsed to single spaces
pub fn extract_text(document: &Html) -> String {
    let text = match Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
    {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };

    collapse_whitespace(&text)
}

/// The text of `<title>`, trimmed, if present and non-empty
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// `img[src]` values as absolute URLs
pub fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    collect_urls(document, base_url, "img[src]", "src")
}

/// `a[href]` entries with their text, resolved against the page
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<LinkData> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            match base_url.join(href.trim()) {
                Ok(absolute) => Some(LinkData {
                    text: a.text().collect::<String>().trim().to_string(),
                    href: absolute.to_string(),
                }),
                Err(_) => {
                    debug!("Invalid link URL: {}", href);
                    None
                }
            }
        })
        .collect()
}

/// Video sources from `<video src>` and `<video><source src>`
pub fn extract_videos(document: &Html, base_url: &Url) -> Vec<String> {
    let mut videos = collect_urls(document, base_url, "video[src]", "src");
    for url in collect_urls(document, base_url, "video source[src]", "src") {
        if !videos.contains(&url) {
            videos.push(url);
        }
    }
    videos
}

/// Contents of every `<style>` element, each followed by a newline
pub fn extract_css(document: &Html) -> String {
    let Ok(selector) = Selector::parse("style") else {
        return String::new();
    };

    document
        .select(&selector)
        .map(|style| format!("{}\n", style.text().collect::<String>()))
        .collect()
}

/// Trimmed text of the first element matching `selector`; "" when none
pub fn select_first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn collect_urls(document: &Html, base_url: &Url, css: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let value = element.value().attr(attr)?;
            match base_url.join(value.trim()) {
                Ok(absolute) => Some(absolute.to_string()),
                Err(_) => {
                    debug!("Invalid {} URL: {}", attr, value);
                    None
                }
            }
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
