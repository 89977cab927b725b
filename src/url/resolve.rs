use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Arguments
///
/// * `href` - The raw attribute value
/// * `base_url` - The URL of the page the link was found on
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/guide/").unwrap()
    }

    #[test]
    fn test_resolves_against_page_url() {
        assert_eq!(
            resolve_link("intro.html", &base()),
            Some("https://example.com/docs/guide/intro.html".to_string())
        );
        assert_eq!(
            resolve_link("/about", &base()),
            Some("https://example.com/about".to_string())
        );
        assert_eq!(
            resolve_link("../api", &base()),
            Some("https://example.com/docs/api".to_string())
        );
    }

    #[test]
    fn test_absolute_links_pass_through() {
        assert_eq!(
            resolve_link("https://other.com/x", &base()),
            Some("https://other.com/x".to_string())
        );
    }

    #[test]
    fn test_special_schemes_are_skipped() {
        assert_eq!(resolve_link("javascript:void(0)", &base()), None);
        assert_eq!(resolve_link("JavaScript:alert(1)", &base()), None);
        assert_eq!(resolve_link("mailto:a@example.com", &base()), None);
        assert_eq!(resolve_link("tel:+15555555555", &base()), None);
        assert_eq!(resolve_link("data:text/html,hi", &base()), None);
        assert_eq!(resolve_link("ftp://example.com/file", &base()), None);
    }

    #[test]
    fn test_fragment_and_empty_links_are_skipped() {
        assert_eq!(resolve_link("#section", &base()), None);
        assert_eq!(resolve_link("   ", &base()), None);
    }
}
