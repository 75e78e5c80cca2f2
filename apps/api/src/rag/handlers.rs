use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::evaluation::Target;
use crate::models::index::{EvaluationIndex, RagContext};
use crate::rag::retriever::format_for_prompt;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub indexed: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RagContextRequest {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub brief_text: String,
}

#[derive(Debug, Serialize)]
pub struct RagContextResponse {
    pub context: RagContext,
    /// Ready to paste into a generation prompt.
    pub formatted: String,
}

/// POST /api/v1/index/rebuild
pub async fn handle_rebuild_index(
    State(state): State<AppState>,
) -> Result<Json<RebuildResponse>, AppError> {
    let (indexed, index) = state.indexer.rebuild().await?;
    info!("Index rebuilt with {indexed} evaluations");
    Ok(Json(RebuildResponse {
        indexed,
        updated_at: index.updated_at,
    }))
}

/// GET /api/v1/index
pub async fn handle_get_index(
    State(state): State<AppState>,
) -> Result<Json<EvaluationIndex>, AppError> {
    Ok(Json(state.indexer.load().await?))
}

/// POST /api/v1/rag-context
/// Never fails on index problems: a broken index reads as "no data".
pub async fn handle_rag_context(
    State(state): State<AppState>,
    Json(req): Json<RagContextRequest>,
) -> Result<Json<RagContextResponse>, AppError> {
    if req.role.trim().is_empty() {
        return Err(AppError::Validation("role must not be empty".into()));
    }
    let target = Target {
        company: req.company,
        role: req.role,
    };

    let context = match state.retriever.retrieve(&target, &req.brief_text).await {
        Ok(context) => context,
        Err(e) => {
            warn!("Retrieval for {target} failed, continuing without history: {e}");
            RagContext::default()
        }
    };

    let formatted = format_for_prompt(&context);
    Ok(Json(RagContextResponse { context, formatted }))
}
