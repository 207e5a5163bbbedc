//! Crawler module for hidden-service fetching and analysis
//!
//! This module contains the core crawling logic, including:
//! - The BFS frontier with per-domain politeness
//! - Fetching through the anonymity session
//! - Link extraction
//! - Page records and the crawl loop itself

mod coordinator;
mod fetcher;
mod parser;
mod record;
mod scheduler;

pub use coordinator::{
    CrawlError, CrawlOutcome, CrawlRequest, Crawler, FetchAttempt, StopReason, TrackError,
};
pub use fetcher::{fetch_page, FailureKind, FetchOutcome, MAX_BODY_BYTES};
pub use parser::extract_links;
pub use record::{PageRecord, PAGES_PREFIX, RETAIN_RISK_ABOVE};
pub use scheduler::{Frontier, FrontierEntry};
