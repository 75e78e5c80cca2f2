use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version of the index file.
pub const INDEX_VERSION: &str = "1.0.0";

/// Seniority band inferred from a role title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleLevel {
    #[serde(rename = "CTO")]
    Cto,
    #[serde(rename = "VP")]
    Vp,
    Director,
    #[serde(rename = "Senior IC")]
    SeniorIc,
    #[default]
    #[serde(rename = "IC")]
    Ic,
}

impl RoleLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RoleLevel::Cto => "CTO",
            RoleLevel::Vp => "VP",
            RoleLevel::Director => "Director",
            RoleLevel::SeniorIc => "Senior IC",
            RoleLevel::Ic => "IC",
        }
    }
}

/// Rough industry inferred from a company name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Fintech,
    Technology,
    Cloud,
    Payments,
    #[default]
    Unknown,
}

/// Search projection of a persisted `Evaluation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEvaluation {
    pub company: String,
    pub role: String,
    pub role_level: RoleLevel,
    pub industry: Industry,
    pub evaluated_at: DateTime<Utc>,
    pub overall_score: u32,
    pub critical_violations: usize,
    #[serde(default)]
    pub lessons_learned: Vec<String>,
    #[serde(default)]
    pub rag_context: String,
    pub path: PathBuf,
}

/// Derived, disposable cache over every persisted evaluation.
/// Always rebuilt wholesale; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationIndex {
    pub evaluations: Vec<IndexedEvaluation>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

impl EvaluationIndex {
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(evaluations: Vec<IndexedEvaluation>) -> Self {
        Self {
            evaluations,
            updated_at: Utc::now(),
            version: INDEX_VERSION.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }
}

/// Retrieval payload for the next generation request. Request-scoped, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagContext {
    pub relevant_lessons: Vec<String>,
    pub common_violations: Vec<String>,
    pub successful_patterns: Vec<String>,
    pub similar_applications: usize,
}
