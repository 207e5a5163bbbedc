//! URL handling module for Darkline
//!
//! This module provides URL normalization, domain extraction, wildcard matching,
//! and the hidden-network address-space check used to keep the crawl inside
//! the anonymized network.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, DEFAULT_SCHEME};

/// Checks whether a host belongs to the hidden-network address space
///
/// `patterns` are host patterns such as `*.onion` or `*.i2p`. The host is
/// lowercased before matching.
///
/// # Examples
///
/// ```
/// use darkline::url::is_network_host;
///
/// let patterns = vec!["*.onion".to_string()];
/// assert!(is_network_host("market.onion", &patterns));
/// assert!(!is_network_host("example.com", &patterns));
/// ```
pub fn is_network_host(host: &str, patterns: &[String]) -> bool {
    let host = host.to_lowercase();
    patterns
        .iter()
        .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &host))
}

/// Checks whether a URL points into the hidden-network address space
pub fn is_network_url(url: &str, patterns: &[String]) -> bool {
    extract_domain(url).is_some_and(|host| is_network_host(&host, patterns))
}
