//! Output module for filtering and summarizing crawl results
//!
//! This module handles:
//! - Filtering page records by risk, keywords and seller attributes
//! - Computing and printing crawl statistics

mod filter;
pub mod stats;

pub use filter::{filter_records, RecordFilter, RiskLevel};
pub use stats::{print_statistics, CrawlStatistics};
