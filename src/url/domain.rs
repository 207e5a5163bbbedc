use url::Url;

/// Extracts the domain from a URL string
///
/// Retrieves the host portion and lowercases it. The port is not part of
/// the domain, so politeness spacing applies per host.
///
/// # Examples
///
/// ```
/// use darkline::url::extract_domain;
///
/// assert_eq!(extract_domain("http://Market.onion/vendor/1"), Some("market.onion".to_string()));
/// assert_eq!(extract_domain("not a url"), None);
/// ```
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}
