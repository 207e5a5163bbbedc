use super::seller::substring_indicators;
use super::{assemble, CategoryDefinition, CategoryMatches, Classifier, RiskAssessment};

/// Basic keyword-presence classifier
///
/// Each keyword counts at most once per text and is matched as a plain
/// substring, so it is cheaper and noisier than the weighted classifier.
pub struct SubstringClassifier {
    categories: Vec<CategoryDefinition>,
    lowered_keywords: Vec<Vec<String>>,
    seller_threshold: usize,
}

impl SubstringClassifier {
    pub fn new(categories: Vec<CategoryDefinition>, seller_threshold: usize) -> Self {
        let lowered_keywords = categories
            .iter()
            .map(|c| c.keywords.iter().map(|k| k.to_lowercase()).collect())
            .collect();

        Self {
            categories,
            lowered_keywords,
            seller_threshold,
        }
    }
}

impl Classifier for SubstringClassifier {
    fn assess(&self, text: &str) -> RiskAssessment {
        if text.trim().is_empty() {
            return RiskAssessment::empty();
        }

        let lowered = text.to_lowercase();

        let matched = self
            .categories
            .iter()
            .zip(&self.lowered_keywords)
            .map(|(definition, keywords)| CategoryMatches {
                definition,
                matches: keywords
                    .iter()
                    .filter(|k| lowered.contains(k.as_str()))
                    .cloned()
                    .collect(),
            })
            .collect();

        assemble(
            matched,
            substring_indicators(&lowered),
            self.seller_threshold,
        )
    }

    fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    fn name(&self) -> &'static str {
        "substring"
    }
}
