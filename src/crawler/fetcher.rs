//! HTTP fetcher
//!
//! Fetches a page through the current anonymity session. Transport
//! failures never escape as errors: they come back as
//! `FetchOutcome::Failed` and end up in an error-tagged page record.

use crate::session::Session;
use reqwest::Response;
use std::fmt;

/// Largest body read from a single response, in bytes
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Non-2xx status
    Http,
    /// Request or body read timed out
    Timeout,
    /// Could not connect (proxy, DNS, refused)
    Connect,
    /// Redirect loop or too many redirects
    Redirect,
    /// Anything else, including broken bodies
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Http => "http",
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Redirect => "redirect",
            FailureKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with its body
    Page {
        /// Final URL after redirects
        final_url: String,
        status: u16,
        body: String,
    },

    /// Non-2xx status or transport error
    Failed {
        kind: FailureKind,
        status: Option<u16>,
        error: String,
    },
}

fn classify_error(e: &reqwest::Error) -> FailureKind {
    if e.is_timeout() {
        FailureKind::Timeout
    } else if e.is_connect() {
        FailureKind::Connect
    } else if e.is_redirect() {
        FailureKind::Redirect
    } else {
        FailureKind::Other
    }
}

/// Fetches a URL with the session's client
///
/// The request timeout is part of the session's client. Bodies larger than
/// `MAX_BODY_BYTES` are cut at that size.
pub async fn fetch_page(session: &Session, url: &str) -> FetchOutcome {
    let response = match session.client().get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::Failed {
                kind: classify_error(&e),
                status: None,
                error: e.to_string(),
            }
        }
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchOutcome::Failed {
            kind: FailureKind::Http,
            status: Some(status.as_u16()),
            error: format!("HTTP {}", status),
        };
    }

    match read_body(response).await {
        Ok(body) => FetchOutcome::Page {
            final_url,
            status: status.as_u16(),
            body,
        },
        Err(e) => FetchOutcome::Failed {
            kind: classify_error(&e),
            status: Some(status.as_u16()),
            error: e.to_string(),
        },
    }
}

async fn read_body(mut response: Response) -> Result<String, reqwest::Error> {
    let mut bytes = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let room = MAX_BODY_BYTES - bytes.len();
        if chunk.len() >= room {
            bytes.extend_from_slice(&chunk[..room]);
            tracing::debug!("Body of {} cut at {} bytes", response.url(), MAX_BODY_BYTES);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::SessionManager;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn direct_session(timeout: Duration) -> Session {
        let config = SessionConfig {
            proxy: None,
            ..Default::default()
        };
        SessionManager::new(config, timeout).new_session().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let session = direct_session(Duration::from_secs(5));
        match fetch_page(&session, &format!("{}/page", server.uri())).await {
            FetchOutcome::Page { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, "<p>hi</p>");
            }
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let session = direct_session(Duration::from_secs(5));
        match fetch_page(&session, &server.uri()).await {
            FetchOutcome::Failed { kind, status, .. } => {
                assert_eq!(kind, FailureKind::Http);
                assert_eq!(status, Some(503));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let session = direct_session(Duration::from_millis(300));
        match fetch_page(&session, &server.uri()).await {
            FetchOutcome::Failed { kind, .. } => assert_eq!(kind, FailureKind::Timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let session = direct_session(Duration::from_secs(2));
        let outcome = fetch_page(&session, &format!("http://{}/", addr)).await;
        assert!(matches!(outcome, FetchOutcome::Failed { status: None, .. }));
    }

    #[tokio::test]
    async fn test_large_body_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_BODY_BYTES + 1000)))
            .mount(&server)
            .await;

        let session = direct_session(Duration::from_secs(10));
        match fetch_page(&session, &server.uri()).await {
            FetchOutcome::Page { body, .. } => assert_eq!(body.len(), MAX_BODY_BYTES),
            other => panic!("expected page, got {:?}", other),
        }
    }
}
