use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::orchestrator::{AttemptOutcome, AttemptRequest, DraftPaths};
use crate::models::evaluation::Target;
use crate::models::source::SourceFacts;
use crate::state::AppState;
use crate::storage::Storage;

fn default_auto_fix() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RunEvaluationRequest {
    /// Caller-chosen id so the attempt can be cancelled while it runs.
    #[serde(default)]
    pub attempt_id: Option<Uuid>,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub brief_text: String,
    pub primary_path: PathBuf,
    pub secondary_path: PathBuf,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_auto_fix")]
    pub auto_fix: bool,
}

/// Resolves a draft path against `root` and refuses anything outside it.
/// Relative paths are taken as relative to `root`. Any `..` component is rejected
/// outright, so the check is purely lexical.
pub fn confine_draft_path(root: &FsPath, path: &FsPath, field: &str) -> Result<PathBuf, AppError> {
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(AppError::Validation(format!(
            "{field} must not contain '..' components"
        )));
    }
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    if !resolved.starts_with(root) || resolved == root {
        return Err(AppError::Validation(format!(
            "{field} must be a file under {}",
            root.display()
        )));
    }
    Ok(resolved)
}

impl RunEvaluationRequest {
    /// Validates the body. Draft paths must resolve to files under `drafts_root`.
    pub fn into_attempt(self, drafts_root: &FsPath) -> Result<AttemptRequest, AppError> {
        if self.company.trim().is_empty() {
            return Err(AppError::Validation("company must not be empty".into()));
        }
        if self.role.trim().is_empty() {
            return Err(AppError::Validation("role must not be empty".into()));
        }
        let primary = confine_draft_path(drafts_root, &self.primary_path, "primary_path")?;
        let secondary = confine_draft_path(drafts_root, &self.secondary_path, "secondary_path")?;
        if primary == secondary {
            return Err(AppError::Validation(
                "primary_path and secondary_path must differ".into(),
            ));
        }

        Ok(AttemptRequest {
            attempt_id: self.attempt_id.unwrap_or_else(Uuid::new_v4),
            target: Target {
                company: self.company.trim().to_string(),
                role: self.role.trim().to_string(),
            },
            brief_text: self.brief_text,
            drafts: DraftPaths {
                primary,
                secondary,
            },
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            auto_fix: self.auto_fix,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub attempt_id: Uuid,
    pub cancelled: bool,
}

/// Loads the source-of-truth facts. Re-read per attempt so edits apply without a restart.
pub async fn load_source_facts(
    storage: &dyn Storage,
    path: &FsPath,
) -> Result<SourceFacts, AppError> {
    let text = storage.read(path).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "Source facts file not found at {}",
            path.display()
        ))
    })?;
    Ok(SourceFacts::from_json(&text)?)
}

/// POST /api/v1/evaluations
pub async fn handle_run_evaluation(
    State(state): State<AppState>,
    Json(req): Json<RunEvaluationRequest>,
) -> Result<Json<AttemptOutcome>, AppError> {
    let attempt = req.into_attempt(&state.config.output_dir)?;

    let (_guard, cancel) = state.attempts.register(attempt.attempt_id).ok_or_else(|| {
        AppError::Conflict(format!("Attempt {} is already in flight", attempt.attempt_id))
    })?;

    info!(
        "Attempt {} for {} started ({} in flight)",
        attempt.attempt_id,
        attempt.target,
        state.attempts.in_flight()
    );

    let facts = load_source_facts(state.storage.as_ref(), &state.config.summaries_path).await?;

    let outcome = state
        .orchestrator
        .run_with_timeout(&attempt, &facts, &cancel, state.config.attempt_timeout())
        .await?;

    info!(
        "Attempt {} finished: overall {} ({} warnings)",
        outcome.attempt_id,
        outcome.evaluation.scores.overall,
        outcome.warnings.len()
    );
    Ok(Json(outcome))
}

/// DELETE /api/v1/evaluations/:attempt_id
pub async fn handle_cancel_evaluation(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CancelResponse>), AppError> {
    if !state.attempts.cancel(&attempt_id) {
        return Err(AppError::NotFound(format!(
            "No attempt {attempt_id} is in flight"
        )));
    }
    info!("Cancellation requested for attempt {attempt_id}");
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            attempt_id,
            cancelled: true,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn body(json: serde_json::Value) -> RunEvaluationRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let attempt = body(serde_json::json!({
            "company": " Acme ",
            "role": "Staff Engineer",
            "primary_path": "/apps/acme/resume.md",
            "secondary_path": "/apps/acme/cover.md"
        }))
        .into_attempt(FsPath::new("/apps"))
        .unwrap();

        assert!(attempt.auto_fix);
        assert_eq!(attempt.target.company, "Acme");
        assert_eq!(attempt.brief_text, "");
        assert!(attempt.generated_at <= Utc::now());
    }

    #[test]
    fn test_request_keeps_caller_attempt_id() {
        let id = Uuid::new_v4();
        let attempt = body(serde_json::json!({
            "attempt_id": id,
            "company": "Acme",
            "role": "CTO",
            "primary_path": "/apps/acme/a.md",
            "secondary_path": "/apps/acme/b.md",
            "auto_fix": false
        }))
        .into_attempt(FsPath::new("/apps"))
        .unwrap();

        assert_eq!(attempt.attempt_id, id);
        assert!(!attempt.auto_fix);
    }

    #[test]
    fn test_request_validation() {
        let blank_role = body(serde_json::json!({
            "company": "Acme",
            "role": "  ",
            "primary_path": "/apps/acme/a.md",
            "secondary_path": "/apps/acme/b.md"
        }));
        assert!(matches!(
            blank_role.into_attempt(FsPath::new("/apps")),
            Err(AppError::Validation(_))
        ));

        let same_paths = body(serde_json::json!({
            "company": "Acme",
            "role": "CTO",
            "primary_path": "/apps/acme/a.md",
            "secondary_path": "/apps/acme/a.md"
        }));
        assert!(matches!(
            same_paths.into_attempt(FsPath::new("/apps")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_relative_draft_paths_resolve_under_root() {
        let attempt = body(serde_json::json!({
            "company": "Acme",
            "role": "CTO",
            "primary_path": "acme/resume.md",
            "secondary_path": "acme/cover.md"
        }))
        .into_attempt(FsPath::new("/apps"))
        .unwrap();
        assert_eq!(attempt.drafts.primary, PathBuf::from("/apps/acme/resume.md"));
        assert_eq!(attempt.drafts.secondary, PathBuf::from("/apps/acme/cover.md"));
    }

    #[test]
    fn test_draft_paths_outside_root_rejected() {
        let root = FsPath::new("/apps");
        for (primary, secondary) in [
            ("/etc/passwd", "/apps/acme/cover.md"),
            ("/apps/acme/resume.md", "/apps/../etc/shadow"),
            ("../secrets.md", "/apps/acme/cover.md"),
            ("/apps-other/resume.md", "/apps/acme/cover.md"),
            ("/apps", "/apps/acme/cover.md"),
        ] {
            let req = body(serde_json::json!({
                "company": "Acme",
                "role": "CTO",
                "primary_path": primary,
                "secondary_path": secondary
            }));
            assert!(
                matches!(req.into_attempt(root), Err(AppError::Validation(_))),
                "{primary} / {secondary} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_load_source_facts() {
        let storage = MemoryStorage::new();
        let path = FsPath::new("/data/summaries.json");

        let missing = load_source_facts(&storage, path).await;
        assert!(matches!(missing, Err(AppError::Internal(_))));

        storage
            .write(path, r#"{"achievements": [{"title": "no id"}]}"#)
            .await
            .unwrap();
        let invalid = load_source_facts(&storage, path).await;
        assert!(matches!(invalid, Err(AppError::SourceFacts(_))));

        storage
            .write(path, r#"{"achievements": [{"id": "ach-1"}], "skills": ["Rust"]}"#)
            .await
            .unwrap();
        let facts = load_source_facts(&storage, path).await.unwrap();
        assert_eq!(facts.fact_ids(), vec!["ach-1"]);
    }
}
