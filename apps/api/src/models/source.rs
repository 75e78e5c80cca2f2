//! Source-of-truth facts the detector checks drafts against.
//!
//! Only the achievement `id` is interpreted here; every other field is
//! passthrough JSON serialized into detector prompts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceFactsError {
    #[error("Source facts are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Achievement at index {0} has no stable string id")]
    MissingId(usize),

    #[error("Duplicate achievement id '{0}'")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceFacts {
    #[serde(default)]
    pub achievements: Vec<Value>,
    #[serde(default)]
    pub profile: Value,
    #[serde(default)]
    pub skills: Value,
}

impl SourceFacts {
    /// Parses the summaries document and checks every achievement carries a unique id.
    pub fn from_json(text: &str) -> Result<Self, SourceFactsError> {
        let facts: SourceFacts = serde_json::from_str(text)?;

        let mut seen = std::collections::HashSet::new();
        for (i, achievement) in facts.achievements.iter().enumerate() {
            let id = achievement
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|id| !id.trim().is_empty())
                .ok_or(SourceFactsError::MissingId(i))?;
            if !seen.insert(id.to_string()) {
                return Err(SourceFactsError::DuplicateId(id.to_string()));
            }
        }

        Ok(facts)
    }

    #[cfg(test)]
    pub fn fact_ids(&self) -> Vec<&str> {
        self.achievements
            .iter()
            .filter_map(|a| a.get("id").and_then(|v| v.as_str()))
            .collect()
    }

    pub fn achievements_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.achievements)
    }

    pub fn profile_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.profile)
    }

    pub fn skills_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.skills)
    }
}
