//! The generation cycle: a bounded retry loop over
//! prompt → model → sanitize → validate → dedup → persist.
//!
//! Each attempt walks the stages in order; any failure records its message as
//! the last error (fed back into the next prompt) and moves on to the next
//! attempt with a higher temperature. History is appended only on the attempt
//! that is accepted.

use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, info, instrument, warn};

use crate::dedup::{DuplicateDetector, SEMANTIC_CHECK_MAX_ATTEMPT};
use crate::difficulty;
use crate::domain::{CandidateQuestion, GeneratedQuestion, GenerationRequest, HistoryEntry};
use crate::embedding::Embedder;
use crate::error::{DuplicateError, GenerationError, HistoryError, ValidationError};
use crate::history::HistoryStore;
use crate::llm::ModelClient;
use crate::prompt::{with_previous_error, PromptBuilder};
use crate::sanitize;
use crate::util::trunc_for_log;
use crate::validate;

/// Attempts per generation cycle.
pub const MAX_RETRIES: u32 = 5;

/// min(0.7, 0.3 + 0.1 × attempt): 0.4, 0.5, 0.6, 0.7, 0.7.
pub fn temperature_for(attempt: u32) -> f32 {
    (0.3 + 0.1 * attempt as f32).min(0.7)
}

/// Where in an attempt we are (or where it failed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Requesting,
    Sanitizing,
    Validating,
    DeduplicatingExact,
    DeduplicatingSemantic,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Requesting => "requesting",
            Stage::Sanitizing => "sanitizing",
            Stage::Validating => "validating",
            Stage::DeduplicatingExact => "dedup_exact",
            Stage::DeduplicatingSemantic => "dedup_semantic",
            Stage::Persisting => "persisting",
        })
    }
}

pub struct QuestionGenerator {
    model: Arc<dyn ModelClient>,
    detector: DuplicateDetector,
    history: Arc<dyn HistoryStore>,
    template: String,
    store_timeout: Duration,
}

impl QuestionGenerator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        embedder: Arc<dyn Embedder>,
        history: Arc<dyn HistoryStore>,
        template: String,
        store_timeout: Duration,
    ) -> Self {
        Self {
            model,
            detector: DuplicateDetector::new(embedder),
            history,
            template,
            store_timeout,
        }
    }

    /// Run one full generation cycle for `req`.
    ///
    /// Fails with `Exhausted` after `MAX_RETRIES` failed attempts, or with
    /// `History` if the session history cannot be loaded at all.
    #[instrument(
        level = "info",
        skip(self, req),
        fields(session_id = %req.session_id, domain = %req.domain_name, program = %req.program_name, base_level = req.level)
    )]
    pub async fn generate(&self, req: &GenerationRequest) -> Result<GeneratedQuestion, GenerationError> {
        let stored = self.load_history(&req.session_id).await?;
        let combined: Vec<HistoryEntry> = stored.into_iter().chain(req.history.iter().cloned()).collect();
        let level = difficulty::adjust(req.level, &combined);
        let prior: Vec<&str> = combined.iter().map(|h| h.question_text.as_str()).collect();

        info!(
            target: "quiz",
            backend = %self.model.describe(),
            history_len = combined.len(),
            base_level = req.level,
            adjusted_level = level,
            "Starting generation cycle"
        );

        let base_prompt = PromptBuilder::new(&self.template).build(&req.domain_name, &req.program_name, level, &prior);
        let mut last_error: Option<String> = None;

        for attempt in 1..=MAX_RETRIES {
            let prompt = with_previous_error(&base_prompt, last_error.as_deref());
            let temperature = temperature_for(attempt);

            match self.attempt(&req.session_id, &prompt, temperature, &prior, attempt).await {
                Ok(question) => {
                    info!(
                        target: "quiz",
                        attempt,
                        question_id = %question.question_id,
                        correct_option_index = question.correct_option_index,
                        correct_option = question.correct_option().unwrap_or_default(),
                        semantic_check = if attempt > SEMANTIC_CHECK_MAX_ATTEMPT { "relaxed" } else { "strict" },
                        "Question accepted"
                    );
                    return Ok(GeneratedQuestion { question, attempts: attempt });
                }
                Err((stage, e)) => {
                    warn!(
                        target: "quiz",
                        attempt,
                        max_attempts = MAX_RETRIES,
                        %stage,
                        kind = e.kind(),
                        error = %e,
                        "Attempt failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        let last_error = last_error.unwrap_or_default();
        warn!(target: "quiz", attempts = MAX_RETRIES, error = %last_error, "Generation exhausted");
        Err(GenerationError::Exhausted { attempts: MAX_RETRIES, last_error })
    }

    async fn attempt(
        &self,
        session_id: &str,
        prompt: &str,
        temperature: f32,
        prior: &[&str],
        attempt: u32,
    ) -> Result<CandidateQuestion, (Stage, GenerationError)> {
        let raw = self
            .model
            .generate(prompt, temperature)
            .await
            .map_err(|e| (Stage::Requesting, e.into()))?;

        let cleaned = sanitize::clean(&raw);
        if cleaned.is_empty() {
            return Err((Stage::Sanitizing, ValidationError::InvalidJson("empty response".into()).into()));
        }

        let question = validate::parse_and_validate(&cleaned).map_err(|e| {
            debug!(target: "quiz", attempt, raw = %trunc_for_log(&raw, 500), "Rejected output");
            (Stage::Validating, e.into())
        })?;

        self.detector
            .check(&question.question_text, prior, attempt)
            .await
            .map_err(|e| {
                let stage = match e {
                    GenerationError::Duplicate(DuplicateError::Exact) => Stage::DeduplicatingExact,
                    _ => Stage::DeduplicatingSemantic,
                };
                (stage, e)
            })?;

        self.append_history(session_id, &question)
            .await
            .map_err(|e| (Stage::Persisting, e.into()))?;

        Ok(question)
    }

    async fn load_history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        tokio::time::timeout(self.store_timeout, self.history.load(session_id))
            .await
            .map_err(|_| HistoryError::Timeout(self.store_timeout.as_secs()))?
    }

    async fn append_history(&self, session_id: &str, q: &CandidateQuestion) -> Result<(), HistoryError> {
        tokio::time::timeout(
            self.store_timeout,
            self.history.append(session_id, &q.question_text, &q.options, q.correct_option_index),
        )
        .await
        .map_err(|_| HistoryError::Timeout(self.store_timeout.as_secs()))?
    }
}
