//! Darkline: hidden-service crawl orchestration and risk classification
//!
//! This crate crawls anonymized hidden-service sites through a proxy-bound
//! session, classifies every fetched page against weighted keyword
//! categories, and tracks marketplace seller profiles over time as
//! immutable snapshots.

pub mod classify;
pub mod config;
pub mod content;
pub mod crawler;
pub mod marketplace;
pub mod output;
pub mod sellers;
pub mod session;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Darkline operations
#[derive(Debug, Error)]
pub enum DarklineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] crawler::CrawlError),

    #[error("Seller tracking error: {0}")]
    Track(#[from] crawler::TrackError),

    #[error("Trend analysis error: {0}")]
    Trend(#[from] sellers::TrendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Darkline operations
pub type Result<T> = std::result::Result<T, DarklineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use classify::{Classifier, RiskAssessment};
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlRequest, Crawler, PageRecord};
pub use sellers::{SellerHistory, SellerHistoryStore, TrendReport};
pub use crate::url::{extract_domain, normalize_url};
