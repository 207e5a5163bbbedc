use super::seller::whole_word_indicators;
use super::{assemble, CategoryDefinition, CategoryMatches, Classifier, RiskAssessment};
use crate::ConfigError;
use regex::Regex;

struct CompiledCategory {
    definition: CategoryDefinition,
    patterns: Vec<Regex>,
}

/// Whole-word weighted keyword classifier
///
/// Every occurrence of a keyword counts toward its category, so repeated
/// mentions raise the sub-score.
pub struct WeightedClassifier {
    categories: Vec<CompiledCategory>,
    definitions: Vec<CategoryDefinition>,
    seller_threshold: usize,
}

impl WeightedClassifier {
    pub fn new(
        categories: Vec<CategoryDefinition>,
        seller_threshold: usize,
    ) -> Result<Self, ConfigError> {
        let compiled = categories
            .iter()
            .map(|definition| {
                let patterns = definition
                    .keywords
                    .iter()
                    .map(|keyword| {
                        let pattern = format!(r"\b{}\b", regex::escape(&keyword.to_lowercase()));
                        Regex::new(&pattern).map_err(|e| {
                            ConfigError::InvalidPattern(format!("keyword '{}': {}", keyword, e))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledCategory {
                    definition: definition.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            categories: compiled,
            definitions: categories,
            seller_threshold,
        })
    }
}

impl Classifier for WeightedClassifier {
    fn assess(&self, text: &str) -> RiskAssessment {
        if text.trim().is_empty() {
            return RiskAssessment::empty();
        }

        let lowered = text.to_lowercase();

        let matched = self
            .categories
            .iter()
            .map(|category| CategoryMatches {
                definition: &category.definition,
                matches: category
                    .patterns
                    .iter()
                    .flat_map(|re| re.find_iter(&lowered).map(|m| m.as_str().to_string()))
                    .collect(),
            })
            .collect();

        assemble(
            matched,
            whole_word_indicators(&lowered),
            self.seller_threshold,
        )
    }

    fn categories(&self) -> &[CategoryDefinition] {
        &self.definitions
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}
