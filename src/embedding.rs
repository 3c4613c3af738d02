//! Embedding providers used by the semantic duplicate check.
//!
//! All texts needed for one similarity check go out in a single batch call.
//! Backends:
//!   - `OllamaEmbedder`: `POST {url}/api/embed` → `embeddings`
//!   - `OpenAiEmbedder`: `POST {url}/embeddings` → `data[].embedding`
//!   - `HashingEmbedder`: offline token-hash vectors, no network

use std::{
  collections::hash_map::DefaultHasher,
  hash::{Hash, Hasher},
  sync::Arc,
  time::Duration,
};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{AppConfig, EmbeddingsProvider};
use crate::error::ProviderError;
use crate::llm::{http_client, status_error};

#[async_trait]
pub trait Embedder: Send + Sync {
  /// One vector per input text, same order, fixed dimension.
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

pub fn build_embedder(cfg: &AppConfig) -> Result<Arc<dyn Embedder>, ProviderError> {
  let e = &cfg.embeddings;
  let timeout = Duration::from_secs(cfg.backend.request_timeout_secs);
  Ok(match e.provider {
    EmbeddingsProvider::Ollama => Arc::new(OllamaEmbedder::new(e.url.clone(), e.model.clone(), timeout)?),
    EmbeddingsProvider::Openai => {
      let key = e.api_key.clone().ok_or_else(|| ProviderError::Request("embeddings API key missing".into()))?;
      Arc::new(OpenAiEmbedder::new(e.url.clone(), e.model.clone(), key, timeout)?)
    }
    EmbeddingsProvider::Hashing => Arc::new(HashingEmbedder::new(e.dimensions)),
  })
}

/// Cosine similarity; 0.0 when either vector has zero norm or sizes differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() || a.is_empty() {
    return 0.0;
  }
  let mut dot = 0.0f32;
  let mut na = 0.0f32;
  let mut nb = 0.0f32;
  for (x, y) in a.iter().zip(b) {
    dot += x * y;
    na += x * x;
    nb += y * y;
  }
  if na == 0.0 || nb == 0.0 {
    return 0.0;
  }
  dot / (na.sqrt() * nb.sqrt())
}

fn check_count(got: usize, want: usize) -> Result<(), ProviderError> {
  if got != want {
    return Err(ProviderError::Envelope(format!("expected {want} embeddings, got {got}")));
  }
  Ok(())
}

// --- Ollama ---

pub struct OllamaEmbedder {
  client: reqwest::Client,
  url: String,
  model: String,
  timeout_secs: u64,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> { model: &'a str, input: &'a [String] }
#[derive(Deserialize)]
struct OllamaEmbedResponse { embeddings: Vec<Vec<f32>> }

impl OllamaEmbedder {
  pub fn new(url: String, model: String, timeout: Duration) -> Result<Self, ProviderError> {
    Ok(Self { client: http_client(timeout)?, url, model, timeout_secs: timeout.as_secs() })
  }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
  #[instrument(level = "debug", skip(self, texts), fields(model = %self.model, count = texts.len()))]
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
    let url = format!("{}/api/embed", self.url.trim_end_matches('/'));
    let res = self.client.post(&url)
      .header(USER_AGENT, "quizgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&OllamaEmbedRequest { model: &self.model, input: texts })
      .send().await
      .map_err(|e| ProviderError::from_reqwest(e, self.timeout_secs))?;
    if !res.status().is_success() {
      return Err(status_error(res).await);
    }
    let body: OllamaEmbedResponse = res.json().await.map_err(|e| ProviderError::Envelope(e.to_string()))?;
    check_count(body.embeddings.len(), texts.len())?;
    Ok(body.embeddings)
  }
}

// --- OpenAI-compatible ---

pub struct OpenAiEmbedder {
  client: reqwest::Client,
  base_url: String,
  model: String,
  api_key: String,
  timeout_secs: u64,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> { model: &'a str, input: &'a [String] }
#[derive(Deserialize)]
struct OpenAiEmbedResponse { data: Vec<OpenAiEmbedding> }
#[derive(Deserialize)]
struct OpenAiEmbedding {
  #[serde(default)] index: usize,
  embedding: Vec<f32>,
}

impl OpenAiEmbedder {
  pub fn new(base_url: String, model: String, api_key: String, timeout: Duration) -> Result<Self, ProviderError> {
    Ok(Self { client: http_client(timeout)?, base_url, model, api_key, timeout_secs: timeout.as_secs() })
  }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
  #[instrument(level = "debug", skip(self, texts), fields(model = %self.model, count = texts.len()))]
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
    let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
    let res = self.client.post(&url)
      .header(USER_AGENT, "quizgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&OpenAiEmbedRequest { model: &self.model, input: texts })
      .send().await
      .map_err(|e| ProviderError::from_reqwest(e, self.timeout_secs))?;
    if !res.status().is_success() {
      return Err(status_error(res).await);
    }
    let mut body: OpenAiEmbedResponse = res.json().await.map_err(|e| ProviderError::Envelope(e.to_string()))?;
    check_count(body.data.len(), texts.len())?;
    body.data.sort_by_key(|d| d.index);
    Ok(body.data.into_iter().map(|d| d.embedding).collect())
  }
}

// --- Offline fallback ---

/// Bag-of-words vectors: lowercase alphanumeric tokens hashed into a fixed
/// number of buckets. Coarse, but deterministic and dependency-free.
pub struct HashingEmbedder {
  dims: usize,
}

impl HashingEmbedder {
  pub fn new(dims: usize) -> Self {
    Self { dims: dims.max(1) }
  }

  fn vector(&self, text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; self.dims];
    for token in text
      .split(|c: char| !c.is_alphanumeric())
      .filter(|t| !t.is_empty())
      .map(str::to_lowercase)
    {
      let mut h = DefaultHasher::new();
      token.hash(&mut h);
      v[(h.finish() % self.dims as u64) as usize] += 1.0;
    }
    v
  }
}

#[async_trait]
impl Embedder for HashingEmbedder {
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
    debug!(target: "quiz", count = texts.len(), dims = self.dims, "Hashing embeddings");
    Ok(texts.iter().map(|t| self.vector(t)).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{routing::post, Json, Router};
  use serde_json::{json, Value};

  #[test]
  fn cosine_basics() {
    assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
  }

  #[tokio::test]
  async fn hashing_embedder_is_case_insensitive_and_deterministic() {
    let e = HashingEmbedder::new(64);
    let out = e
      .embed(&["What is a list?".to_string(), "what IS a LIST".to_string(), "Explain ownership in Rust".to_string()])
      .await
      .expect("embed");
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|v| v.len() == 64));
    assert!((cosine_similarity(&out[0], &out[1]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&out[0], &out[2]) < 0.85);
  }

  #[tokio::test]
  async fn ollama_embedder_batches_all_texts() {
    let app = Router::new().route("/api/embed", post(|Json(body): Json<Value>| async move {
      let n = body["input"].as_array().map(|a| a.len()).unwrap_or_default();
      let embeddings: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, 1.0]).collect();
      Json(json!({ "model": body["model"], "embeddings": embeddings }))
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
      let _ = axum::serve(listener, app).await;
    });

    let e = OllamaEmbedder::new(format!("http://{addr}/"), "all-minilm".into(), Duration::from_secs(5)).expect("embedder");
    let out = e.embed(&["a".to_string(), "b".to_string(), "c".to_string()]).await.expect("embed");
    assert_eq!(out, vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 1.0]]);
  }

  #[tokio::test]
  async fn openai_embedder_orders_by_index() {
    let app = Router::new().route("/v1/embeddings", post(|| async {
      Json(json!({ "data": [
        { "index": 1, "embedding": [0.0, 1.0] },
        { "index": 0, "embedding": [1.0, 0.0] }
      ]}))
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
      let _ = axum::serve(listener, app).await;
    });

    let e = OpenAiEmbedder::new(format!("http://{addr}/v1"), "m".into(), "k".into(), Duration::from_secs(5)).expect("embedder");
    let out = e.embed(&["first".to_string(), "second".to_string()]).await.expect("embed");
    assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

    let err = e.embed(&["only one".to_string()]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Envelope(_)));
  }
}
