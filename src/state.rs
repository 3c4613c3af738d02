//! Application state: the quiz service wired to the configured backends.
//!
//! This module owns construction only:
//!   - the text-generation client (Ollama or Groq, chosen once)
//!   - the embedder used by the semantic duplicate check
//!   - the session history store
//!   - the prefetch pool
//!
//! Handlers reach everything through `AppState::service`.

use std::{sync::Arc, time::Duration};

use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::embedding::build_embedder;
use crate::error::ProviderError;
use crate::history::InMemoryHistoryStore;
use crate::llm::build_model_client;
use crate::orchestrator::QuestionGenerator;
use crate::prefetch::PrefetchPool;
use crate::service::QuizService;

pub struct AppState {
    pub service: QuizService,
}

impl AppState {
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &AppConfig) -> Result<Self, ProviderError> {
        let model = build_model_client(cfg)?;
        let embedder = build_embedder(cfg)?;
        let history = Arc::new(InMemoryHistoryStore::new());

        info!(
            target: "quiz_backend",
            backend = %model.describe(),
            max_concurrent_prefetch = cfg.prefetch.max_concurrent,
            "Backends ready"
        );

        let generator = QuestionGenerator::new(
            model,
            embedder,
            history,
            cfg.prompts.quiz_template.clone(),
            Duration::from_secs(cfg.history.timeout_secs),
        );
        let pool = PrefetchPool::new(cfg.prefetch.max_concurrent);

        Ok(Self { service: QuizService::new(generator, pool, cfg.prefetch.enabled) })
    }

    /// State around an already-built service (tests).
    #[cfg(test)]
    pub fn with_service(service: QuizService) -> Self {
        Self { service }
    }
}
