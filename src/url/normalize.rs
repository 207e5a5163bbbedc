use crate::{UrlError, UrlResult};
use url::Url;

/// Scheme assumed for scheme-less input; hidden services are plain HTTP
/// behind the proxy.
pub const DEFAULT_SCHEME: &str = "http";

/// Normalizes a URL according to Darkline's normalization rules
///
/// # Normalization Steps
///
/// 1. Prefix `http://` when the input has no scheme
/// 2. Parse the URL; reject if malformed or not HTTP(S)
/// 3. Lowercase the host (done by the parser) and drop credentials
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and duplicate slashes
///    - Remove trailing slash, including the root slash
/// 5. Remove fragment (everything after #)
/// 6. Remove an empty query string (trailing ?)
///
/// The result is a plain string so that `normalize_url(normalize_url(u))`
/// is the identity.
///
/// # Examples
///
/// ```
/// use darkline::url::normalize_url;
///
/// assert_eq!(normalize_url("http://x.onion/a/").unwrap(), "http://x.onion/a");
/// assert_eq!(normalize_url("X.ONION/#top").unwrap(), "http://x.onion");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<String> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("{}://{}", DEFAULT_SCHEME, trimmed))
                .map_err(|e| UrlError::Parse(e.to_string()))?
        }
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_username("")
        .map_err(|_| UrlError::Malformed("cannot clear username".to_string()))?;
    url.set_password(None)
        .map_err(|_| UrlError::Malformed("cannot clear password".to_string()))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    let serialized = url.to_string();
    let result = if url.path() == "/" {
        match url.query() {
            Some(_) => serialized.replacen("/?", "?", 1),
            None => serialized.trim_end_matches('/').to_string(),
        }
    } else {
        serialized
    };

    Ok(result)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Empty segments come from duplicate slashes
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}
