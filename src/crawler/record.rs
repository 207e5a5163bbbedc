//! Page records produced by a crawl

use crate::classify::{CategoryScore, RiskAssessment};
use crate::content::ExtractedContent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Key prefix for stored page records
pub const PAGES_PREFIX: &str = "pages";

/// Risk score above which a page is always retained
pub const RETAIN_RISK_ABOVE: u8 = 50;

/// Structured result for one fetched page
///
/// Failed fetches carry only `url`, `depth`, `status` (if any), `error` and
/// `timestamp`; every analysis field is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: u32,
    pub title: String,
    pub description: String,
    pub content_sample: String,
    pub found_keywords: BTreeSet<String>,
    pub risk_score: u8,
    pub risk_categories: BTreeMap<String, CategoryScore>,
    pub category: String,
    pub marketplace: Option<String>,
    pub is_seller: bool,
    pub seller_id: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PageRecord {
    /// Builds a record for a successfully fetched and analysed page
    pub fn analyzed(
        url: &str,
        depth: u32,
        status: u16,
        content: &ExtractedContent,
        assessment: RiskAssessment,
        marketplace: Option<String>,
        seller_id: Option<String>,
    ) -> Self {
        Self {
            url: url.to_string(),
            depth,
            title: content.title.clone(),
            description: content.description.clone(),
            content_sample: content.sample(),
            found_keywords: assessment.found_keywords,
            risk_score: assessment.score,
            risk_categories: assessment.categories,
            category: assessment.category,
            is_seller: assessment.is_seller || seller_id.is_some(),
            marketplace,
            seller_id,
            status: Some(status),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Builds an error-tagged record for a failed fetch
    pub fn failed(url: &str, depth: u32, status: Option<u16>, error: String) -> Self {
        Self {
            url: url.to_string(),
            depth,
            title: String::new(),
            description: String::new(),
            content_sample: String::new(),
            found_keywords: BTreeSet::new(),
            risk_score: 0,
            risk_categories: BTreeMap::new(),
            category: crate::classify::UNKNOWN_CATEGORY.to_string(),
            marketplace: None,
            is_seller: false,
            seller_id: None,
            status,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the record belongs in the result set
    ///
    /// Error records are always kept so every failed URL stays visible.
    /// Successful pages are kept if a keyword matched, the risk score is
    /// above 50, or the page carried any title or text at all.
    pub fn should_retain(&self) -> bool {
        self.is_error()
            || !self.found_keywords.is_empty()
            || self.risk_score > RETAIN_RISK_ABOVE
            || !self.title.is_empty()
            || !self.content_sample.is_empty()
    }

    /// Storage key for this record
    pub fn storage_key(&self) -> String {
        let digest = hex::encode(Sha256::digest(self.url.as_bytes()));
        format!(
            "{}/{}_{}.json",
            PAGES_PREFIX,
            self.timestamp.format("%Y%m%dT%H%M%S%6fZ"),
            &digest[..16]
        )
    }
}
