pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::evaluation::handlers as evaluation;
use crate::rag::handlers as rag;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Evaluation loop
        .route("/api/v1/evaluations", post(evaluation::handle_run_evaluation))
        .route(
            "/api/v1/evaluations/:attempt_id",
            delete(evaluation::handle_cancel_evaluation),
        )
        // Index + retrieval
        .route("/api/v1/index", get(rag::handle_get_index))
        .route("/api/v1/index/rebuild", post(rag::handle_rebuild_index))
        .route("/api/v1/rag-context", post(rag::handle_rag_context))
        .with_state(state)
}
