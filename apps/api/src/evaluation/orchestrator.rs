//! Evaluation Orchestrator: the evaluate → fix → re-evaluate loop for one attempt.
//!
//! 1. Evaluate#1: run the detector on the drafts as written.
//! 2. Zero violations (or auto-fix disabled): go straight to step 5.
//! 3. Fix: apply pattern fixes and write changed drafts back.
//! 4. Evaluate#2: run the detector again on the drafts as stored.
//! 5. Score & persist: score the final report, build the evaluation record,
//!    persist it, then rebuild the index.
//!
//! Detector failures abort the attempt. Fix write-back, persistence and
//! indexing failures are logged and reported as warnings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::cancel::CancelSignal;
use crate::evaluation::detector::{EvaluationRequest, ViolationDetector};
use crate::evaluation::fixer::Fixer;
use crate::models::evaluation::{DetectionReport, Evaluation, FloorReport, Target, Violation};
use crate::models::source::SourceFacts;
use crate::rag::indexer::Indexer;
use crate::scoring::scorer::Scorer;
use crate::storage::Storage;

/// Schema version stamped on every evaluation record.
pub const EVALUATION_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPaths {
    pub primary: PathBuf,
    pub secondary: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRequest {
    pub attempt_id: Uuid,
    pub target: Target,
    pub brief_text: String,
    pub drafts: DraftPaths,
    pub generated_at: DateTime<Utc>,
    /// When false the attempt is scored on Evaluate#1 alone.
    pub auto_fix: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt_id: Uuid,
    pub evaluation: Evaluation,
    pub evaluation_path: Option<PathBuf>,
    pub applied_fixes: Vec<String>,
    pub resolved_violations: Vec<Violation>,
    pub unresolved_violations: Vec<Violation>,
    pub indexed_count: Option<usize>,
    /// Severity floors the final overall score fell below.
    pub floors: FloorReport,
    pub warnings: Vec<String>,
}

pub struct EvaluationOrchestrator {
    detector: Arc<dyn ViolationDetector>,
    fixer: Arc<Fixer>,
    scorer: Scorer,
    indexer: Indexer,
    storage: Arc<dyn Storage>,
}

impl EvaluationOrchestrator {
    pub fn new(
        detector: Arc<dyn ViolationDetector>,
        fixer: Arc<Fixer>,
        scorer: Scorer,
        indexer: Indexer,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            detector,
            fixer,
            scorer,
            indexer,
            storage,
        }
    }

    /// Runs one attempt under an overall time budget.
    pub async fn run_with_timeout(
        &self,
        request: &AttemptRequest,
        facts: &SourceFacts,
        cancel: &CancelSignal,
        budget: Duration,
    ) -> Result<AttemptOutcome, AppError> {
        match tokio::time::timeout(budget, self.run(request, facts, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Attempt {} for {} exceeded {}s",
                    request.attempt_id,
                    request.target,
                    budget.as_secs()
                );
                Err(AppError::Timeout(budget.as_secs()))
            }
        }
    }

    pub async fn run(
        &self,
        request: &AttemptRequest,
        facts: &SourceFacts,
        cancel: &CancelSignal,
    ) -> Result<AttemptOutcome, AppError> {
        let target = &request.target;
        let mut warnings = Vec::new();

        info!("Attempt {}: evaluating drafts for {}", request.attempt_id, target);

        let mut primary = self.read_draft(&request.drafts.primary).await?;
        let mut secondary = self.read_draft(&request.drafts.secondary).await?;

        let initial = self
            .detect("initial evaluation", request, facts, &primary, &secondary, cancel)
            .await?;
        let initial_count = initial.total_violations();
        info!(
            "Attempt {}: initial evaluation found {} violations",
            request.attempt_id, initial_count
        );

        let mut applied_fixes = Vec::new();
        let mut resolved_violations = Vec::new();

        let final_report = if initial_count == 0 {
            info!("Attempt {}: no violations, skipping fix pass", request.attempt_id);
            initial
        } else if !request.auto_fix {
            info!("Attempt {}: auto-fix disabled, scoring initial evaluation", request.attempt_id);
            initial
        } else {
            let fixed = self.fixer.apply_fixes(&primary, &secondary, &initial);
            info!(
                "Attempt {}: applied {} fixes",
                request.attempt_id,
                fixed.applied.len()
            );

            if fixed.primary != primary {
                match self.storage.write(&request.drafts.primary, &fixed.primary).await {
                    Ok(()) => primary = fixed.primary,
                    Err(e) => {
                        warn!("Could not write fixed primary draft: {e}");
                        warnings.push(format!("primary draft fix not saved: {e}"));
                    }
                }
            }
            if fixed.secondary != secondary {
                match self.storage.write(&request.drafts.secondary, &fixed.secondary).await {
                    Ok(()) => secondary = fixed.secondary,
                    Err(e) => {
                        warn!("Could not write fixed secondary draft: {e}");
                        warnings.push(format!("secondary draft fix not saved: {e}"));
                    }
                }
            }
            applied_fixes = fixed.applied;
            resolved_violations = fixed.resolved;

            let verified = self
                .detect("re-evaluation", request, facts, &primary, &secondary, cancel)
                .await?;
            info!(
                "Attempt {}: re-evaluation found {} violations (was {})",
                request.attempt_id,
                verified.total_violations(),
                initial_count
            );
            verified
        };

        // Nothing is persisted for an attempt cancelled before this point.
        cancel.check()?;

        let evaluation = self.build_evaluation(request, &final_report);
        let unresolved_violations: Vec<Violation> =
            final_report.all_violations().cloned().collect();

        info!(
            "Attempt {}: overall score {}/100 with {} unresolved violations",
            request.attempt_id,
            evaluation.scores.overall,
            unresolved_violations.len()
        );

        let floors = self.scorer.floor_report(&evaluation.scores);
        if floors.any() {
            warn!(
                "Attempt {}: overall {} is below a severity floor ({:?})",
                request.attempt_id, evaluation.scores.overall, floors
            );
        }

        let evaluation_path = match self.indexer.persist(&evaluation).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to persist evaluation for {}: {e}", target);
                warnings.push(format!("evaluation not persisted: {e}"));
                None
            }
        };

        let indexed_count = match self.indexer.rebuild().await {
            Ok((count, _)) => Some(count),
            Err(e) => {
                warn!("Failed to rebuild evaluation index: {e}");
                warnings.push(format!("index not rebuilt: {e}"));
                None
            }
        };

        Ok(AttemptOutcome {
            attempt_id: request.attempt_id,
            evaluation,
            evaluation_path,
            applied_fixes,
            resolved_violations,
            unresolved_violations,
            indexed_count,
            floors,
            warnings,
        })
    }

    async fn read_draft(&self, path: &Path) -> Result<String, AppError> {
        self.storage
            .read(path)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Draft not found: {}", path.display())))
    }

    async fn detect(
        &self,
        stage: &str,
        request: &AttemptRequest,
        facts: &SourceFacts,
        primary: &str,
        secondary: &str,
        cancel: &CancelSignal,
    ) -> Result<DetectionReport, AppError> {
        let eval_request = EvaluationRequest::new(
            &request.target,
            &request.brief_text,
            primary.to_string(),
            secondary.to_string(),
            facts,
        )
        .map_err(|e| AppError::Internal(e.into()))?;

        cancel
            .race(self.detector.detect(&eval_request))
            .await?
            .map_err(|e| AppError::Llm(format!("{stage} failed for {}: {e}", request.target)))
    }

    fn build_evaluation(&self, request: &AttemptRequest, report: &DetectionReport) -> Evaluation {
        let scores = self.scorer.score(report);

        let mut lessons = self.scorer.extract_lessons(&scores);
        for lesson in &report.lessons_learned {
            if !lessons.contains(lesson) {
                lessons.push(lesson.clone());
            }
        }

        let rag_context = self.scorer.build_rag_text(&request.target, &scores, &lessons);

        Evaluation {
            attempt_id: request.attempt_id,
            company: request.target.company.clone(),
            role: request.target.role.clone(),
            generated_at: request.generated_at,
            evaluated_at: Utc::now(),
            scores,
            jd_match: report.jd_match.clone(),
            lessons,
            rag_context,
            version: EVALUATION_VERSION.to_string(),
        }
    }
}
