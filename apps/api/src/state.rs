use std::sync::Arc;

use crate::config::Config;
use crate::evaluation::cancel::AttemptRegistry;
use crate::evaluation::detector::ViolationDetector;
use crate::evaluation::fixer::Fixer;
use crate::evaluation::orchestrator::EvaluationOrchestrator;
use crate::rag::indexer::Indexer;
use crate::rag::retriever::Retriever;
use crate::scoring::scorer::Scorer;
use crate::storage::Storage;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub orchestrator: Arc<EvaluationOrchestrator>,
    pub indexer: Indexer,
    pub retriever: Retriever,
    /// In-flight attempts, for cancellation over HTTP.
    pub attempts: Arc<AttemptRegistry>,
}

impl AppState {
    /// Wires the evaluation loop over one storage backend and detector.
    /// The index lives under `config.output_dir`.
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        detector: Arc<dyn ViolationDetector>,
    ) -> Self {
        let indexer = Indexer::new(Arc::clone(&storage), config.output_dir.clone());
        let orchestrator = EvaluationOrchestrator::new(
            detector,
            Arc::new(Fixer::standard()),
            Scorer::default(),
            indexer.clone(),
            Arc::clone(&storage),
        );

        Self {
            config,
            storage,
            orchestrator: Arc::new(orchestrator),
            retriever: Retriever::new(indexer.clone()),
            indexer,
            attempts: Arc::new(AttemptRegistry::new()),
        }
    }
}
