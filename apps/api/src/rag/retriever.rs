//! Retriever: finds past evaluations similar to a new application and turns
//! them into lessons for the next generation prompt.
//!
//! Similarity (additive, not normalised):
//!   +0.5  same inferred role level
//!   +0.3  overall score below 80
//!   +0.4  any critical violations
//! Records scoring above 0.3 are "similar".

use tracing::debug;

use crate::models::evaluation::Target;
use crate::models::index::{IndexedEvaluation, RagContext, RoleLevel};
use crate::rag::classify::infer_role_level;
use crate::rag::indexer::Indexer;
use crate::scoring::rules::{
    FORBIDDEN_INDUSTRY_CLAIMS, FORBIDDEN_NUMBER_FABRICATION, FORBIDDEN_PATTERN_MATCHING,
    FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS, METRIC_FABRICATION, SKILL_FABRICATION,
    TEMPORAL_IMPOSSIBILITY,
};
use crate::storage::StorageError;

pub const SIMILARITY_THRESHOLD: f64 = 0.3;
pub const ROLE_LEVEL_WEIGHT: f64 = 0.5;
pub const LOW_SCORE_WEIGHT: f64 = 0.3;
pub const CRITICAL_WEIGHT: f64 = 0.4;
pub const LOW_SCORE_CUTOFF: u32 = 80;
pub const SUCCESS_SCORE: u32 = 85;

pub const NO_DATA_SENTINEL: &str = "No previous evaluation data available.";

/// Rule tokens searched for in each record's RAG text, with the label shown in prompts.
/// Order breaks frequency ties.
const VIOLATION_LABELS: &[(&str, &str)] = &[
    (
        FORBIDDEN_NUMBER_FABRICATION,
        "Number fabrication (inventing metrics/headcounts)",
    ),
    (
        FORBIDDEN_INDUSTRY_CLAIMS,
        "Industry fabrication (claiming industries not in experience)",
    ),
    (
        FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS,
        "Domain fabrication (claiming technical domains not in experience)",
    ),
    (
        FORBIDDEN_PATTERN_MATCHING,
        "Pattern matching (claiming work 'mirrors' domains candidate lacks)",
    ),
    (
        SKILL_FABRICATION,
        "Skill fabrication (listing skills not in source data)",
    ),
    (
        METRIC_FABRICATION,
        "Metric fabrication (percentages or amounts not in source metrics)",
    ),
    (
        TEMPORAL_IMPOSSIBILITY,
        "Temporal impossibility (more years than the technology has existed)",
    ),
];

pub fn similarity(record: &IndexedEvaluation, role_level: RoleLevel) -> f64 {
    let mut score = 0.0;
    if record.role_level == role_level {
        score += ROLE_LEVEL_WEIGHT;
    }
    if record.overall_score < LOW_SCORE_CUTOFF {
        score += LOW_SCORE_WEIGHT;
    }
    if record.critical_violations > 0 {
        score += CRITICAL_WEIGHT;
    }
    score
}

#[derive(Clone)]
pub struct Retriever {
    indexer: Indexer,
}

impl Retriever {
    pub fn new(indexer: Indexer) -> Self {
        Self { indexer }
    }

    /// Builds a `RagContext` from every indexed record similar to `target`.
    /// `brief_text` is accepted for callers that have it; similarity does not use it yet.
    pub async fn retrieve(
        &self,
        target: &Target,
        _brief_text: &str,
    ) -> Result<RagContext, StorageError> {
        let index = self.indexer.load().await?;
        let role_level = infer_role_level(&target.role);
        debug!(
            "Retrieving for {} ({}) over {} indexed evaluations",
            target,
            role_level.label(),
            index.len()
        );

        let similar: Vec<&IndexedEvaluation> = index
            .evaluations
            .iter()
            .filter(|record| similarity(record, role_level) > SIMILARITY_THRESHOLD)
            .collect();

        Ok(build_context(&similar))
    }
}

pub fn build_context(similar: &[&IndexedEvaluation]) -> RagContext {
    let mut context = RagContext {
        similar_applications: similar.len(),
        ..Default::default()
    };

    let mut counts = vec![0usize; VIOLATION_LABELS.len()];

    for record in similar {
        for lesson in &record.lessons_learned {
            if !context.relevant_lessons.contains(lesson) {
                context.relevant_lessons.push(lesson.clone());
            }
        }

        for (i, (token, _)) in VIOLATION_LABELS.iter().enumerate() {
            if record.rag_context.contains(token) {
                counts[i] += 1;
            }
        }

        if record.overall_score >= SUCCESS_SCORE {
            context.successful_patterns.push(format!(
                "{} application scored {} - good example",
                record.company, record.overall_score
            ));
        }
    }

    let mut ranked: Vec<(usize, usize)> = counts
        .into_iter()
        .enumerate()
        .filter(|(_, count)| *count > 0)
        .collect();
    // Stable sort keeps catalog order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    context.common_violations = ranked
        .into_iter()
        .map(|(i, count)| format!("{} (occurred {} times)", VIOLATION_LABELS[i].1, count))
        .collect();

    context
}

/// Renders a `RagContext` for injection into a generation prompt.
pub fn format_for_prompt(context: &RagContext) -> String {
    if context.similar_applications == 0 {
        return NO_DATA_SENTINEL.to_string();
    }

    let mut out = format!(
        "**LEARNING FROM {} PREVIOUS APPLICATIONS:**\n\n",
        context.similar_applications
    );
    push_section(&mut out, "**COMMON VIOLATIONS TO AVOID:**", &context.common_violations);
    push_section(&mut out, "**LESSONS LEARNED:**", &context.relevant_lessons);
    push_section(&mut out, "**SUCCESSFUL PATTERNS:**", &context.successful_patterns);
    out
}

fn push_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(heading);
    out.push('\n');
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}
