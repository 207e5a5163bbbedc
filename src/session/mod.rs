//! Anonymity session management
//!
//! A `SessionManager` owns the proxy-bound HTTP client configuration for one
//! crawl run and the identity generation counter. Every successful identity
//! rotation bumps the generation; sessions built before it are stale and
//! must be replaced via `new_session`.
//!
//! A manager is created per run and never shared between runs.

mod control;

pub use control::{ControlAuth, IdentityController, TorController};

use crate::config::SessionConfig;
use reqwest::{redirect::Policy, Client, Proxy};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from the anonymizing session or its control channel
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    #[error("Control port unavailable at {address}: {reason}")]
    ControllerUnavailable { address: String, reason: String },

    #[error("Control port I/O error: {0}")]
    ControllerIo(#[from] std::io::Error),

    #[error("Control port authentication failed: {0}")]
    Authentication(String),

    #[error("Control port rejected command: {0}")]
    Rejected(String),

    #[error("Control port did not answer within {0:?}")]
    Timeout(Duration),
}

/// A live HTTP client bound to the anonymizing proxy
///
/// Cloning is cheap; the underlying client is reference counted.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    generation: u64,
}

impl Session {
    /// The HTTP client for this session
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Identity generation this session was built under
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Builds sessions and rotates the anonymizing identity for one run
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    fetch_timeout: Duration,
    generation: u64,
    resolve_overrides: Vec<(String, SocketAddr)>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, fetch_timeout: Duration) -> Self {
        Self {
            config,
            fetch_timeout,
            generation: 0,
            resolve_overrides: Vec::new(),
        }
    }

    /// Pins a host name to a fixed socket address in every session
    ///
    /// Only meaningful when running without a proxy; with a SOCKS proxy the
    /// proxy resolves host names.
    pub fn with_resolve_override(mut self, host: &str, addr: SocketAddr) -> Self {
        self.resolve_overrides.push((host.to_string(), addr));
        self
    }

    /// Current identity generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Checks whether a session was built under the current identity
    pub fn is_current(&self, session: &Session) -> bool {
        session.generation == self.generation
    }

    /// Builds a new session for the current identity
    pub fn new_session(&self) -> Result<Session, SessionError> {
        let mut builder = Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .timeout(self.fetch_timeout)
            .connect_timeout(self.fetch_timeout)
            .redirect(Policy::limited(10))
            .gzip(true)
            .brotli(true);

        match &self.config.proxy {
            Some(proxy) => {
                builder = builder.proxy(Proxy::all(proxy.as_str())?);
            }
            None => {
                tracing::warn!("No proxy configured, requests go out directly");
                builder = builder.no_proxy();
            }
        }

        for (host, addr) in &self.resolve_overrides {
            builder = builder.resolve(host, *addr);
        }

        let client = builder.build()?;

        tracing::debug!("Built session for identity generation {}", self.generation);

        Ok(Session {
            client,
            generation: self.generation,
        })
    }

    /// Asks the controller for a fresh identity, then waits for it to settle
    ///
    /// On success the generation is bumped and existing sessions become
    /// stale. A cancelled settle wait still counts as success since the
    /// signal was already accepted.
    pub async fn try_rotate_identity(
        &mut self,
        controller: &mut dyn IdentityController,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        controller.authenticate().await?;
        controller.request_new_identity().await?;

        self.generation += 1;

        let settle = Duration::from_millis(self.config.settle_ms);
        tokio::select! {
            _ = tokio::time::sleep(settle) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Settle wait after identity rotation cancelled");
            }
        }

        tracing::info!("Identity rotated (generation {})", self.generation);
        Ok(())
    }

    /// Best-effort rotation
    ///
    /// Returns false if the controller could not be reached or refused. The
    /// existing session stays usable either way.
    pub async fn rotate_identity(
        &mut self,
        controller: &mut dyn IdentityController,
        cancel: &CancellationToken,
    ) -> bool {
        match self.try_rotate_identity(controller, cancel).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Identity rotation failed: {}", e);
                false
            }
        }
    }
}
