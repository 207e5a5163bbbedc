//! Risk classification for extracted page text
//!
//! A `Classifier` scores text against a table of weighted keyword
//! categories, labels it with a single best-fit category and decides whether
//! it looks like a seller page. Two implementations exist:
//!
//! - `WeightedClassifier`: whole-word matching, every occurrence counts
//! - `SubstringClassifier`: plain substring presence, one count per keyword
//!
//! Both share the same scoring arithmetic. For each category with at least
//! one match, the sub-score is `min(100, matches * weight / 5)`; the overall
//! score is `min(100, sum(sub_score * weight / 100))`, rounded.

mod categories;
mod seller;
mod substring;
mod weighted;

pub use categories::{default_categories, CategoryDefinition};
pub use seller::SELLER_INDICATORS;
pub use substring::SubstringClassifier;
pub use weighted::WeightedClassifier;

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label used when no category matched
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Per-category result: the sub-score and every keyword occurrence found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    pub matches: Vec<String>,
}

/// Result of classifying one piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Overall risk, 0 through 100
    pub score: u8,

    /// Only categories with at least one match appear here
    pub categories: BTreeMap<String, CategoryScore>,

    /// Best-fit category, or "unknown"
    pub category: String,

    /// Distinct keywords that matched, across all categories
    pub found_keywords: BTreeSet<String>,

    pub is_seller: bool,

    /// Seller indicator words that were found
    pub seller_indicators: Vec<String>,
}

impl RiskAssessment {
    /// Assessment for text that matched nothing
    pub fn empty() -> Self {
        Self {
            score: 0,
            categories: BTreeMap::new(),
            category: UNKNOWN_CATEGORY.to_string(),
            found_keywords: BTreeSet::new(),
            is_seller: false,
            seller_indicators: Vec::new(),
        }
    }
}

/// Capability interface for risk classifiers
///
/// Implementations are pure: the same text always yields the same
/// assessment, and no state is kept between calls.
pub trait Classifier: Send + Sync {
    /// Scores the given text
    fn assess(&self, text: &str) -> RiskAssessment;

    /// The category table this classifier was built with
    fn categories(&self) -> &[CategoryDefinition];

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Builds the classifier selected by configuration
pub fn build_classifier(config: &ClassifierConfig) -> Result<Box<dyn Classifier>, ConfigError> {
    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "keyword category table is empty".to_string(),
        ));
    }

    let classifier: Box<dyn Classifier> = match config.kind {
        ClassifierKind::Weighted => Box::new(WeightedClassifier::new(
            config.categories.clone(),
            config.seller_indicator_threshold,
        )?),
        ClassifierKind::Substring => Box::new(SubstringClassifier::new(
            config.categories.clone(),
            config.seller_indicator_threshold,
        )),
    };

    tracing::debug!(
        "Built {} classifier with {} categories",
        classifier.name(),
        classifier.categories().len()
    );

    Ok(classifier)
}

/// Per-category matches collected by an implementation, in table order
pub(crate) struct CategoryMatches<'a> {
    pub definition: &'a CategoryDefinition,
    pub matches: Vec<String>,
}

/// Shared scoring and labelling over collected matches
pub(crate) fn assemble(
    matched: Vec<CategoryMatches<'_>>,
    seller_indicators: Vec<String>,
    seller_threshold: usize,
) -> RiskAssessment {
    let mut total = 0.0_f64;
    let mut categories = BTreeMap::new();
    let mut found_keywords = BTreeSet::new();
    let mut best: Option<(&str, usize)> = None;

    for entry in matched {
        let count = entry.matches.len();
        if count == 0 {
            continue;
        }

        let weight = f64::from(entry.definition.weight);
        let sub_score = (count as f64 * weight / 5.0).min(100.0);
        total += sub_score * (weight / 100.0);

        // Strictly greater keeps the earlier category on ties
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((entry.definition.name.as_str(), count));
        }

        found_keywords.extend(entry.matches.iter().cloned());
        categories.insert(
            entry.definition.name.clone(),
            CategoryScore {
                score: sub_score,
                matches: entry.matches,
            },
        );
    }

    let is_seller = seller_threshold > 0 && seller_indicators.len() >= seller_threshold;

    RiskAssessment {
        score: total.min(100.0).round() as u8,
        category: best
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        categories,
        found_keywords,
        is_seller,
        seller_indicators,
    }
}
