//! Rule Catalog: the static table of violation rules and scoring weights.
//!
//! The catalog is an immutable value handed to `Scorer` at construction.
//! `RuleCatalog::standard()` is the production rule set; tests build
//! alternates with `RuleCatalog::new`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::evaluation::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    AntiFabrication,
    Accuracy,
    Quality,
}

/// A single scoring rule. `weight` is the number of points deducted per violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub description: String,
    pub weight: u32,
}

impl Rule {
    fn new(
        name: &str,
        category: RuleCategory,
        severity: Severity,
        description: &str,
        weight: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            severity,
            description: description.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("Category weights must sum to 1.0, got {0}")]
    WeightsDoNotSumToOne(f64),

    #[error("Category weight for {0:?} is negative")]
    NegativeWeight(RuleCategory),
}

/// Fractional contribution of each rule category to the primary-document total.
/// Invariant: weights sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    anti_fabrication: f64,
    accuracy: f64,
    quality: f64,
}

impl CategoryWeights {
    pub fn new(anti_fabrication: f64, accuracy: f64, quality: f64) -> Result<Self, CatalogError> {
        for (category, weight) in [
            (RuleCategory::AntiFabrication, anti_fabrication),
            (RuleCategory::Accuracy, accuracy),
            (RuleCategory::Quality, quality),
        ] {
            if weight < 0.0 {
                return Err(CatalogError::NegativeWeight(category));
            }
        }

        let sum = anti_fabrication + accuracy + quality;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(CatalogError::WeightsDoNotSumToOne(sum));
        }

        Ok(Self {
            anti_fabrication,
            accuracy,
            quality,
        })
    }

    pub fn get(&self, category: RuleCategory) -> f64 {
        match category {
            RuleCategory::AntiFabrication => self.anti_fabrication,
            RuleCategory::Accuracy => self.accuracy,
            RuleCategory::Quality => self.quality,
        }
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            anti_fabrication: 0.50,
            accuracy: 0.30,
            quality: 0.20,
        }
    }
}

/// Blend of section totals into the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionWeights {
    pub resume: f64,
    pub cover_letter: f64,
}

impl Default for SectionWeights {
    fn default() -> Self {
        Self {
            resume: 0.70,
            cover_letter: 0.30,
        }
    }
}

/// Minimum score a document set should keep when it carries violations of a
/// given severity. Reported alongside scores; not enforced by the scorer.
pub const CRITICAL_SCORE_FLOOR: u32 = 60;
pub const MAJOR_SCORE_FLOOR: u32 = 70;

pub const FORBIDDEN_NUMBER_FABRICATION: &str = "FORBIDDEN_NUMBER_FABRICATION";
pub const FORBIDDEN_INDUSTRY_CLAIMS: &str = "FORBIDDEN_INDUSTRY_CLAIMS";
pub const FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS: &str = "FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS";
pub const FORBIDDEN_PATTERN_MATCHING: &str = "FORBIDDEN_PATTERN_MATCHING";
pub const SKILL_FABRICATION: &str = "SKILL_FABRICATION";
pub const WEAK_QUANTIFICATIONS: &str = "WEAK_QUANTIFICATIONS";
pub const COMPANY_DATE_MISMATCH: &str = "COMPANY_DATE_MISMATCH";
pub const ROLE_TITLE_MISMATCH: &str = "ROLE_TITLE_MISMATCH";
pub const YEARS_EXPERIENCE_WRONG: &str = "YEARS_EXPERIENCE_WRONG";
pub const METRIC_FABRICATION: &str = "METRIC_FABRICATION";
pub const TEMPORAL_IMPOSSIBILITY: &str = "TEMPORAL_IMPOSSIBILITY";
pub const POOR_JD_ALIGNMENT: &str = "POOR_JD_ALIGNMENT";
pub const INAPPROPRIATE_TONE: &str = "INAPPROPRIATE_TONE";

#[derive(Debug, Clone, PartialEq)]
pub struct RuleCatalog {
    rules: HashMap<String, Rule>,
    category_weights: CategoryWeights,
    section_weights: SectionWeights,
}

impl RuleCatalog {
    pub fn new(
        rules: Vec<Rule>,
        category_weights: CategoryWeights,
        section_weights: SectionWeights,
    ) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.name.clone(), r)).collect(),
            category_weights,
            section_weights,
        }
    }

    /// The production rule set.
    pub fn standard() -> Self {
        use RuleCategory::{Accuracy, AntiFabrication, Quality};
        use Severity::{Critical, Major, Minor};

        let rules = vec![
            Rule::new(
                FORBIDDEN_NUMBER_FABRICATION,
                AntiFabrication,
                Critical,
                "Numbers invented that don't exist in source achievement metrics",
                30,
            ),
            Rule::new(
                FORBIDDEN_INDUSTRY_CLAIMS,
                AntiFabrication,
                Critical,
                "Industry claims (climate-tech, gaming, etc.) not in achievement companies",
                25,
            ),
            Rule::new(
                FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS,
                AntiFabrication,
                Critical,
                "Technical domain claims (satellite imagery, geospatial) not in achievements",
                25,
            ),
            Rule::new(
                FORBIDDEN_PATTERN_MATCHING,
                AntiFabrication,
                Critical,
                "Claims that work 'mirrors' or is 'similar to' a domain the candidate lacks",
                20,
            ),
            Rule::new(
                SKILL_FABRICATION,
                AntiFabrication,
                Major,
                "Skills listed that are not in source skills data",
                15,
            ),
            Rule::new(
                WEAK_QUANTIFICATIONS,
                AntiFabrication,
                Minor,
                "Small numbers that undermine credibility (7 clusters, 3 regions, etc.)",
                5,
            ),
            Rule::new(
                COMPANY_DATE_MISMATCH,
                Accuracy,
                Critical,
                "Employment dates don't match source achievement data",
                25,
            ),
            Rule::new(
                ROLE_TITLE_MISMATCH,
                Accuracy,
                Critical,
                "Role titles modified from source achievement data",
                20,
            ),
            Rule::new(
                YEARS_EXPERIENCE_WRONG,
                Accuracy,
                Critical,
                "Years of experience doesn't match the profile",
                25,
            ),
            Rule::new(
                METRIC_FABRICATION,
                Accuracy,
                Critical,
                "Metrics (percentages, dollar amounts) not in achievement metrics",
                20,
            ),
            Rule::new(
                TEMPORAL_IMPOSSIBILITY,
                Accuracy,
                Major,
                "Claims N years with a tool that hasn't existed for N years",
                15,
            ),
            Rule::new(
                POOR_JD_ALIGNMENT,
                Quality,
                Minor,
                "Resume doesn't emphasize brief-relevant achievements",
                5,
            ),
            Rule::new(
                INAPPROPRIATE_TONE,
                Quality,
                Minor,
                "Cover letter tone doesn't match company culture signals",
                5,
            ),
        ];

        Self::new(rules, CategoryWeights::default(), SectionWeights::default())
    }

    /// Unknown rule names return `None`; callers ignore them.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Weight of a rule, or 0 if the rule is not in the catalog.
    pub fn weight_of(&self, name: &str) -> u32 {
        self.get(name).map(|r| r.weight).unwrap_or(0)
    }

    pub fn category_weights(&self) -> &CategoryWeights {
        &self.category_weights
    }

    pub fn section_weights(&self) -> &SectionWeights {
        &self.section_weights
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_contents() {
        let catalog = RuleCatalog::standard();
        assert_eq!(catalog.len(), 13);

        let rule = catalog.get(FORBIDDEN_NUMBER_FABRICATION).unwrap();
        assert_eq!(rule.category, RuleCategory::AntiFabrication);
        assert_eq!(rule.severity, Severity::Critical);
        assert_eq!(rule.weight, 30);

        assert_eq!(
            catalog.get(TEMPORAL_IMPOSSIBILITY).unwrap().category,
            RuleCategory::Accuracy
        );
    }

    #[test]
    fn test_unknown_rule_weighs_nothing() {
        let catalog = RuleCatalog::standard();
        assert!(catalog.get("SOME_FUTURE_RULE").is_none());
        assert_eq!(catalog.weight_of("SOME_FUTURE_RULE"), 0);
    }

    #[test]
    fn test_default_category_weights_sum_to_one() {
        let w = CategoryWeights::default();
        let sum = w.get(RuleCategory::AntiFabrication)
            + w.get(RuleCategory::Accuracy)
            + w.get(RuleCategory::Quality);
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_weights_reject_bad_sum() {
        assert_eq!(
            CategoryWeights::new(0.5, 0.5, 0.5),
            Err(CatalogError::WeightsDoNotSumToOne(1.5))
        );
    }

    #[test]
    fn test_category_weights_reject_negative() {
        assert_eq!(
            CategoryWeights::new(1.2, -0.2, 0.0),
            Err(CatalogError::NegativeWeight(RuleCategory::Accuracy))
        );
    }

    #[test]
    fn test_custom_catalog_substitutes_rules() {
        let catalog = RuleCatalog::new(
            vec![Rule::new("ONLY_RULE", RuleCategory::Quality, Severity::Minor, "", 7)],
            CategoryWeights::new(0.4, 0.4, 0.2).unwrap(),
            SectionWeights::default(),
        );
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.weight_of("ONLY_RULE"), 7);
        assert_eq!(catalog.weight_of(FORBIDDEN_NUMBER_FABRICATION), 0);
    }
}
