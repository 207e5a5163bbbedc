/// Checks if a host matches a wildcard pattern
///
/// Two pattern forms are supported:
/// 1. Exact match: "mirror.onion" matches only "mirror.onion"
/// 2. Wildcard match: "*.onion" matches:
///    - "onion" (the bare suffix)
///    - "abc123.onion" (single label)
///    - "forum.abc123.onion" (nested labels)
///
/// # Examples
///
/// ```
/// use darkline::url::matches_wildcard;
///
/// assert!(matches_wildcard("mirror.onion", "mirror.onion"));
/// assert!(!matches_wildcard("mirror.onion", "other.onion"));
///
/// assert!(matches_wildcard("*.onion", "abc123.onion"));
/// assert!(matches_wildcard("*.onion", "forum.abc123.onion"));
/// assert!(!matches_wildcard("*.onion", "abc123.i2p"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
