//! Statistics for a finished crawl run
//!
//! This module summarizes a `CrawlOutcome` and prints the summary for the
//! command line.

use crate::config::FilterConfig;
use crate::crawler::{CrawlOutcome, StopReason};
use crate::output::filter::RiskLevel;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Crawl statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStatistics {
    /// Fetches completed, errors included
    pub pages_crawled: usize,

    /// Records retained in the result set
    pub records: usize,

    /// Error-tagged records
    pub errors: usize,

    pub seller_pages: usize,
    pub profiles_tracked: usize,

    /// Entries discovered but not fetched
    pub residual: usize,

    /// Retained non-error records per category label
    pub by_category: BTreeMap<String, usize>,

    pub by_level: BTreeMap<RiskLevel, usize>,

    pub marketplaces: BTreeSet<String>,

    /// URL and score of the riskiest page
    pub highest_risk: Option<(String, u8)>,

    pub stop_reason: StopReason,
}

impl CrawlStatistics {
    pub fn from_outcome(outcome: &CrawlOutcome, thresholds: &FilterConfig) -> Self {
        let mut by_category = BTreeMap::new();
        let mut by_level = BTreeMap::new();
        let mut marketplaces = BTreeSet::new();
        let mut highest_risk: Option<(String, u8)> = None;
        let mut errors = 0;
        let mut seller_pages = 0;

        for record in &outcome.records {
            if record.is_error() {
                errors += 1;
                continue;
            }

            *by_category.entry(record.category.clone()).or_insert(0) += 1;
            *by_level
                .entry(RiskLevel::for_score(record.risk_score, thresholds))
                .or_insert(0) += 1;

            if record.is_seller {
                seller_pages += 1;
            }

            if let Some(marketplace) = &record.marketplace {
                marketplaces.insert(marketplace.clone());
            }

            if highest_risk
                .as_ref()
                .map_or(true, |(_, score)| record.risk_score > *score)
            {
                highest_risk = Some((record.url.clone(), record.risk_score));
            }
        }

        Self {
            pages_crawled: outcome.pages_crawled,
            records: outcome.records.len(),
            errors,
            seller_pages,
            profiles_tracked: outcome.profiles_tracked,
            residual: outcome.residual_frontier.len(),
            by_category,
            by_level,
            marketplaces,
            highest_risk,
            stop_reason: outcome.stop_reason,
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages crawled: {}", stats.pages_crawled);
    println!("  Records kept: {}", stats.records);
    println!("  Errors: {}", stats.errors);
    println!("  Seller pages: {}", stats.seller_pages);
    println!("  Profiles tracked: {}", stats.profiles_tracked);
    println!("  Left in frontier: {}", stats.residual);
    println!("  Stopped: {:?}", stats.stop_reason);
    println!();

    if !stats.by_category.is_empty() {
        println!("Records by Category:");
        let mut category_counts: Vec<_> = stats.by_category.iter().collect();
        category_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (category, count) in category_counts {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if !stats.by_level.is_empty() {
        println!("Records by Risk Level:");
        for (level, count) in stats.by_level.iter().rev() {
            println!("  {}: {}", level, count);
        }
        println!();
    }

    if !stats.marketplaces.is_empty() {
        println!("Marketplaces Seen ({}):", stats.marketplaces.len());
        for marketplace in &stats.marketplaces {
            println!("  - {}", marketplace);
        }
        println!();
    }

    if let Some((url, score)) = &stats.highest_risk {
        println!("Highest Risk: {} ({})", url, score);
    }
}
