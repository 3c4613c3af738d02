//! Request-level flow: serve the session's prefetched question if it is still
//! valid, otherwise generate synchronously and queue a prefetch for next time.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::{GeneratedQuestion, GenerationRequest};
use crate::error::GenerationError;
use crate::orchestrator::QuestionGenerator;
use crate::prefetch::{PrefetchCache, PrefetchPool};
use crate::validate;

pub struct QuizService {
    generator: Arc<QuestionGenerator>,
    cache: Arc<PrefetchCache>,
    pool: PrefetchPool,
    prefetch_enabled: bool,
}

impl QuizService {
    pub fn new(generator: QuestionGenerator, pool: PrefetchPool, prefetch_enabled: bool) -> Self {
        Self {
            generator: Arc::new(generator),
            cache: Arc::new(PrefetchCache::new()),
            pool,
            prefetch_enabled,
        }
    }

    #[instrument(level = "info", skip(self, req), fields(session_id = %req.session_id))]
    pub async fn next_question(&self, req: GenerationRequest) -> Result<GeneratedQuestion, GenerationError> {
        if let Some(hit) = self.cache.consume(&req.session_id).await {
            match validate::revalidate(&hit.question) {
                Ok(()) => {
                    info!(target: "quiz", question_id = %hit.question.question_id, "Served prefetched question");
                    return Ok(hit);
                }
                Err(e) => {
                    let stale = GenerationError::CacheStale(e.to_string());
                    warn!(target: "quiz", kind = stale.kind(), error = %stale, "Discarding prefetched question");
                }
            }
        }

        let generated = self.generator.generate(&req).await?;
        self.schedule_prefetch(req);
        Ok(generated)
    }

    fn schedule_prefetch(&self, req: GenerationRequest) {
        if !self.prefetch_enabled {
            return;
        }
        let generator = self.generator.clone();
        let cache = self.cache.clone();
        let label = req.session_id.clone();
        self.pool.submit(&label, async move {
            match generator.generate(&req).await {
                Ok(q) => cache.replace(&req.session_id, q).await,
                Err(e) => warn!(
                    target: "quiz",
                    session_id = %req.session_id,
                    kind = e.kind(),
                    error = %e,
                    "Prefetch failed"
                ),
            }
        });
    }
}
