use crate::UrlError;
use url::Url;

/// Parses a URL and checks that it can be crawled
///
/// # Arguments
///
/// * `url_str` - The URL string to parse
///
/// # Returns
///
/// * `Ok(Url)` - An absolute http(s) URL with a host
/// * `Err(UrlError)` - The URL is malformed, uses another scheme or has no host
///
/// # Examples
///
/// ```
/// use web_harvest::url::parse_http_url;
///
/// assert!(parse_http_url("https://example.com/start").is_ok());
/// assert!(parse_http_url("ftp://example.com/").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Returns the origin (scheme, host and port) of a URL, e.g. `https://example.com`
///
/// Default ports are omitted. Returns `None` when the string does not parse
/// or has an opaque origin.
pub fn origin_of(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let origin = url.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}

/// Returns true if `url_str` parses and shares `base_origin`
pub fn is_same_origin(url_str: &str, base_origin: &str) -> bool {
    origin_of(url_str).is_some_and(|origin| origin == base_origin)
}

/// Returns the path component of a URL, or `None` if it does not parse
pub fn path_of(url_str: &str) -> Option<String> {
    Url::parse(url_str).ok().map(|url| url.path().to_string())
}
