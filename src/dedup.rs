//! Repeat detection against a session's history view
//! (persisted history followed by caller-supplied history).

use std::sync::Arc;

use tracing::debug;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{DuplicateError, GenerationError};
use crate::util::normalize_question;

/// Similarity at or above which a candidate counts as a semantic repeat.
pub const SEMANTIC_THRESHOLD: f32 = 0.85;

/// Semantic checks run only on attempts up to and including this one.
pub const SEMANTIC_CHECK_MAX_ATTEMPT: u32 = 3;

pub struct DuplicateDetector {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl DuplicateDetector {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, threshold: SEMANTIC_THRESHOLD }
    }

    /// Case-insensitive, trimmed full-text equality with any prior question.
    pub fn exact_repeat(candidate: &str, history: &[&str]) -> bool {
        let q = normalize_question(candidate);
        history.iter().any(|h| normalize_question(h) == q)
    }

    /// Highest cosine similarity between the candidate and any prior question,
    /// or `None` for an empty history (no embedding call is made).
    pub async fn max_similarity(&self, candidate: &str, history: &[&str]) -> Result<Option<f32>, GenerationError> {
        if history.is_empty() {
            return Ok(None);
        }
        let mut texts: Vec<String> = history.iter().map(|s| s.to_string()).collect();
        texts.push(candidate.to_string());

        let mut vectors = self.embedder.embed(&texts).await?;
        let candidate_vec = vectors.pop().unwrap_or_default();
        let best = vectors
            .iter()
            .map(|v| cosine_similarity(&candidate_vec, v))
            .fold(f32::MIN, f32::max);
        Ok(Some(best))
    }

    /// The best similarity when it reaches the threshold, `None` otherwise.
    /// Always `None` for an empty history.
    pub async fn semantic_repeat(&self, candidate: &str, history: &[&str]) -> Result<Option<f32>, GenerationError> {
        let best = self.max_similarity(candidate, history).await?;
        debug!(target: "quiz", similarity = ?best, "Semantic similarity computed");
        Ok(best.filter(|s| *s >= self.threshold))
    }

    /// Run the checks for one attempt. Semantic is skipped after
    /// `SEMANTIC_CHECK_MAX_ATTEMPT` so late attempts can land near-duplicates
    /// instead of exhausting the budget.
    pub async fn check(&self, candidate: &str, history: &[&str], attempt: u32) -> Result<(), GenerationError> {
        if Self::exact_repeat(candidate, history) {
            return Err(DuplicateError::Exact.into());
        }
        if attempt > SEMANTIC_CHECK_MAX_ATTEMPT {
            debug!(target: "quiz", attempt, "Semantic check relaxed");
            return Ok(());
        }
        if let Some(similarity) = self.semantic_repeat(candidate, history).await? {
            return Err(DuplicateError::Semantic { similarity }.into());
        }
        Ok(())
    }
}
