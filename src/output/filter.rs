//! Record filtering
//!
//! Narrows a set of page records by risk, keywords, seller status,
//! category, marketplace and date window. Every active criterion must hold;
//! a filter that excludes everything returns an empty set.

use crate::config::FilterConfig;
use crate::crawler::PageRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Coarse risk band derived from the configured thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Band for a score; anything below `medium_risk` is low
    pub fn for_score(score: u8, thresholds: &FilterConfig) -> Self {
        if score >= thresholds.high_risk {
            RiskLevel::High
        } else if score >= thresholds.medium_risk {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// Criteria for `filter_records`
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Minimum risk score; defaults to the configured low threshold
    pub min_risk: Option<u8>,
    pub level: Option<RiskLevel>,
    /// Keep records mentioning any of these (case-insensitive)
    pub keywords: Vec<String>,
    pub sellers_only: bool,
    pub category: Option<String>,
    pub marketplace: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Keep error records; they bypass every criterion but the date window
    pub include_errors: bool,
}

impl RecordFilter {
    fn in_window(&self, record: &PageRecord) -> bool {
        self.since.map_or(true, |since| record.timestamp >= since)
            && self.until.map_or(true, |until| record.timestamp <= until)
    }

    fn mentions_keyword(&self, record: &PageRecord) -> bool {
        if self.keywords.is_empty() {
            return true;
        }

        let haystack = format!(
            "{} {} {}",
            record.title, record.description, record.content_sample
        )
        .to_lowercase();

        self.keywords.iter().any(|keyword| {
            let keyword = keyword.to_lowercase();
            record.found_keywords.contains(&keyword) || haystack.contains(&keyword)
        })
    }

    fn matches(&self, record: &PageRecord, thresholds: &FilterConfig) -> bool {
        if !self.in_window(record) {
            return false;
        }

        if record.is_error() {
            return self.include_errors;
        }

        let min_risk = self.min_risk.unwrap_or(thresholds.low_risk);
        if record.risk_score < min_risk {
            return false;
        }

        if let Some(level) = self.level {
            if RiskLevel::for_score(record.risk_score, thresholds) != level {
                return false;
            }
        }

        if self.sellers_only && !record.is_seller {
            return false;
        }

        if let Some(category) = &self.category {
            if !record.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if let Some(marketplace) = &self.marketplace {
            if !record
                .marketplace
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(marketplace))
            {
                return false;
            }
        }

        self.mentions_keyword(record)
    }
}

/// Records passing `filter`, highest risk first
///
/// Records with equal scores keep their fetch order.
pub fn filter_records<'a>(
    records: &'a [PageRecord],
    filter: &RecordFilter,
    thresholds: &FilterConfig,
) -> Vec<&'a PageRecord> {
    let mut kept: Vec<&PageRecord> = records
        .iter()
        .filter(|record| filter.matches(record, thresholds))
        .collect();

    kept.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

    tracing::debug!("Filter kept {} of {} records", kept.len(), records.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(url: &str, score: u8, category: &str) -> PageRecord {
        let mut record = PageRecord::failed(url, 0, Some(200), String::new());
        record.error = None;
        record.risk_score = score;
        record.category = category.to_string();
        record.title = format!("page {}", url);
        record
    }

    fn sample() -> Vec<PageRecord> {
        let mut seller = record("http://c.onion", 90, "weapons");
        seller.is_seller = true;
        seller.marketplace = Some("darkmarket".to_string());
        seller.found_keywords = BTreeSet::from(["pistol".to_string()]);

        vec![
            record("http://a.onion", 35, "drugs"),
            record("http://b.onion", 65, "hacking"),
            seller,
            record("http://d.onion", 10, "unknown"),
            PageRecord::failed("http://e.onion", 1, None, "timeout".to_string()),
        ]
    }

    fn urls(records: Vec<&PageRecord>) -> Vec<&str> {
        records.into_iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn test_default_threshold_and_order() {
        let records = sample();
        let kept = filter_records(&records, &RecordFilter::default(), &FilterConfig::default());
        assert_eq!(
            urls(kept),
            vec!["http://c.onion", "http://b.onion", "http://a.onion"]
        );
    }

    #[test]
    fn test_risk_level() {
        let records = sample();
        let filter = RecordFilter {
            level: Some(RiskLevel::Medium),
            ..Default::default()
        };
        let kept = filter_records(&records, &filter, &FilterConfig::default());
        assert_eq!(urls(kept), vec!["http://b.onion"]);
    }

    #[test]
    fn test_keyword_seller_and_marketplace() {
        let records = sample();
        let filter = RecordFilter {
            keywords: vec!["PISTOL".to_string()],
            sellers_only: true,
            marketplace: Some("DarkMarket".to_string()),
            ..Default::default()
        };
        let kept = filter_records(&records, &filter, &FilterConfig::default());
        assert_eq!(urls(kept), vec!["http://c.onion"]);
    }

    #[test]
    fn test_over_restrictive_filter_is_empty() {
        let records = sample();
        let filter = RecordFilter {
            category: Some("counterfeit".to_string()),
            ..Default::default()
        };
        assert!(filter_records(&records, &filter, &FilterConfig::default()).is_empty());
    }

    #[test]
    fn test_error_records_on_request() {
        let records = sample();
        let filter = RecordFilter {
            min_risk: Some(100),
            include_errors: true,
            ..Default::default()
        };
        let kept = filter_records(&records, &filter, &FilterConfig::default());
        assert_eq!(urls(kept), vec!["http://e.onion"]);
    }

    #[test]
    fn test_date_window() {
        let records = sample();
        let filter = RecordFilter {
            min_risk: Some(0),
            since: Some(Utc::now() + chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(filter_records(&records, &filter, &FilterConfig::default()).is_empty());
    }

    #[test]
    fn test_risk_level_parsing_and_bands() {
        let thresholds = FilterConfig::default();
        assert_eq!("HIGH".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert!("severe".parse::<RiskLevel>().is_err());
        assert_eq!(RiskLevel::for_score(80, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::for_score(60, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::for_score(0, &thresholds), RiskLevel::Low);
    }
}
