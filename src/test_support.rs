//! Shared fixtures for unit tests: scripted backends and request builders.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{GenerationRequest, HistoryEntry};
use crate::embedding::Embedder;
use crate::error::ProviderError;
use crate::history::HistoryStore;
use crate::llm::ModelClient;
use crate::orchestrator::QuestionGenerator;
use crate::prompt::QUIZ_PROMPT_TEMPLATE;

/// A well-formed model response. `index` is written as-is so tests can send
/// out-of-range values.
pub fn question_json(text: &str, index: i64) -> String {
    json!({
        "question_id": "q-test",
        "question_text": text,
        "options": ["Option A", "Option B", "Option C", "Option D"],
        "correct_option_index": index,
        "hint": "Think about it",
        "explanation": "Because",
        "code_context": null
    })
    .to_string()
}

pub fn request(session_id: &str, level: u8, history: Vec<HistoryEntry>) -> GenerationRequest {
    GenerationRequest {
        domain_name: "Python".into(),
        program_name: "Data Structures".into(),
        level,
        session_id: session_id.into(),
        history,
    }
}

pub fn generator(
    model: Arc<dyn ModelClient>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn HistoryStore>,
) -> QuestionGenerator {
    QuestionGenerator::new(model, embedder, store, QUIZ_PROMPT_TEMPLATE.to_string(), Duration::from_secs(10))
}

/// Replays a fixed script and records every (prompt, temperature) it sees.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    seen: Mutex<Vec<(String, f32)>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self { script: Mutex::new(script.into()), seen: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<(String, f32)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push((prompt.to_string(), temperature));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Request("script exhausted".into())))
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

/// Always answers with a new, numbered question.
#[derive(Default)]
pub struct FreshModel {
    calls: AtomicUsize,
}

impl FreshModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for FreshModel {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(question_json(&format!("Generated question number {n}?"), 1))
    }

    fn describe(&self) -> String {
        "fresh".into()
    }
}

/// Maps every text to the same vector, so any non-empty history is a semantic repeat.
pub struct NearDuplicateEmbedder;

#[async_trait]
impl Embedder for NearDuplicateEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|_| vec![0.5, 0.5, 0.5]).collect())
    }
}

/// One-hot vectors by position, so no two texts are ever similar.
pub struct OrthogonalEmbedder;

#[async_trait]
impl Embedder for OrthogonalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok((0..texts.len())
            .map(|i| {
                let mut v = vec![0.0; texts.len()];
                v[i] = 1.0;
                v
            })
            .collect())
    }
}
