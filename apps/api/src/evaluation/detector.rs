//! Violation Detector: the external audit call behind a trait.
//!
//! `LlmViolationDetector` sends drafts plus source facts to Claude and parses
//! the evaluation-result JSON. Tests swap in scripted implementations.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::evaluation::prompts::EVALUATION_PROMPT_TEMPLATE;
use crate::llm_client::prompts::{EVALUATOR_STANCE, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::evaluation::{DetectionReport, Target};
use crate::models::source::SourceFacts;

/// Everything the detector needs for one pass.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub company: String,
    pub role: String,
    pub brief_text: String,
    pub primary_draft: String,
    pub secondary_draft: String,
    pub achievements_json: String,
    pub skills_json: String,
    pub profile_json: String,
}

impl EvaluationRequest {
    pub fn new(
        target: &Target,
        brief_text: &str,
        primary_draft: String,
        secondary_draft: String,
        facts: &SourceFacts,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            company: target.company.clone(),
            role: target.role.clone(),
            brief_text: brief_text.to_string(),
            primary_draft,
            secondary_draft,
            achievements_json: facts.achievements_json()?,
            skills_json: facts.skills_json()?,
            profile_json: facts.profile_json()?,
        })
    }
}

#[async_trait]
pub trait ViolationDetector: Send + Sync {
    async fn detect(&self, request: &EvaluationRequest) -> Result<DetectionReport, LlmError>;
}

/// Production detector backed by a dedicated `LlmClient` (evaluation model, larger budget).
pub struct LlmViolationDetector {
    llm: LlmClient,
}

impl LlmViolationDetector {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ViolationDetector for LlmViolationDetector {
    async fn detect(&self, request: &EvaluationRequest) -> Result<DetectionReport, LlmError> {
        let prompt = build_evaluation_prompt(request);
        info!(
            "Running violation detection for {} - {} with {}",
            request.company,
            request.role,
            self.llm.model()
        );
        self.llm.call_json(&prompt, Some(JSON_ONLY_SYSTEM)).await
    }
}

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").ok());

/// Fills the template in one pass over the template text only, so braces in
/// substituted values (drafts, brief, facts) are never read as placeholders.
/// Unknown names are left as written.
fn build_evaluation_prompt(request: &EvaluationRequest) -> String {
    let Some(placeholder) = PLACEHOLDER.as_ref() else {
        warn!("Placeholder pattern failed to compile, sending raw template");
        return EVALUATION_PROMPT_TEMPLATE.to_string();
    };
    placeholder
        .replace_all(EVALUATION_PROMPT_TEMPLATE, |caps: &Captures<'_>| {
            let value = match &caps[1] {
                "evaluator_stance" => EVALUATOR_STANCE,
                "company" => request.company.as_str(),
                "role" => request.role.as_str(),
                "brief_text" => request.brief_text.as_str(),
                "achievements_json" => request.achievements_json.as_str(),
                "skills_json" => request.skills_json.as_str(),
                "profile_json" => request.profile_json.as_str(),
                "primary_draft" => request.primary_draft.as_str(),
                "secondary_draft" => request.secondary_draft.as_str(),
                _ => return caps[0].to_string(),
            };
            value.to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EvaluationRequest {
        let facts = SourceFacts::from_json(
            r#"{"achievements": [{"id": "ach-1", "metrics": ["40% faster"]}],
                "profile": {"years_experience": 20},
                "skills": {"languages": ["Rust"]}}"#,
        )
        .unwrap();
        EvaluationRequest::new(
            &Target {
                company: "Acme".to_string(),
                role: "Staff Engineer".to_string(),
            },
            "We need Rust and Kubernetes.",
            "# Resume\nBuilt things".to_string(),
            "Dear Acme".to_string(),
            &facts,
        )
        .unwrap()
    }

    #[test]
    fn test_prompt_fills_every_placeholder() {
        let prompt = build_evaluation_prompt(&request());
        for placeholder in [
            "{evaluator_stance}",
            "{company}",
            "{role}",
            "{brief_text}",
            "{achievements_json}",
            "{skills_json}",
            "{profile_json}",
            "{primary_draft}",
            "{secondary_draft}",
        ] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
        assert!(prompt.contains("TARGET: Acme - Staff Engineer"));
        assert!(prompt.contains("\"ach-1\""));
        assert!(prompt.contains("# Resume\nBuilt things"));
    }

    #[test]
    fn test_draft_text_with_braces_is_left_alone() {
        let mut req = request();
        req.primary_draft = "Wrote {role} templating".to_string();
        let prompt = build_evaluation_prompt(&req);
        assert!(prompt.contains("Wrote {role} templating"));
    }

    #[test]
    fn test_placeholder_names_inside_values_stay_literal() {
        let mut req = request();
        req.brief_text = "Template engine work: {primary_draft}".to_string();
        req.primary_draft = "Shipped {secondary_draft} support".to_string();
        req.secondary_draft = "Dear Acme".to_string();
        let prompt = build_evaluation_prompt(&req);

        assert!(prompt.contains("Template engine work: {primary_draft}"));
        assert!(prompt.contains("Shipped {secondary_draft} support"));
        assert_eq!(prompt.matches("Shipped {secondary_draft} support").count(), 1);
        assert_eq!(prompt.matches("Dear Acme").count(), 1);
    }
}
