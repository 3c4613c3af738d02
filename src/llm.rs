//! Text-generation backends behind one `ModelClient` seam.
//!
//! Two interchangeable backends:
//!   - `OllamaClient`: local generation server, JSON-constrained output mode.
//!   - `GroqClient`: hosted OpenAI-compatible chat completions (bearer key).
//!
//! Exactly one is built at startup (`build_model_client`) and injected as
//! `Arc<dyn ModelClient>`. Calls log model names, latencies and response sizes,
//! never the API key; payloads are truncated.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::util::trunc_for_log;

const UA: &str = "quizgen-backend/0.1";

#[async_trait]
pub trait ModelClient: Send + Sync {
  /// Send one prompt and return the raw model text.
  async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError>;

  /// Backend label for logs.
  fn describe(&self) -> String;
}

/// Build the single active backend from static configuration.
pub fn build_model_client(cfg: &AppConfig) -> Result<Arc<dyn ModelClient>, ProviderError> {
  let timeout = Duration::from_secs(cfg.backend.request_timeout_secs);
  if cfg.backend.use_groq {
    let api_key = cfg
      .groq
      .api_key
      .clone()
      .ok_or_else(|| ProviderError::Request("Groq API key missing".into()))?;
    let client = GroqClient::new(
      cfg.groq.api_url.clone(),
      cfg.groq.model.clone(),
      api_key,
      cfg.groq.max_completion_tokens,
      timeout,
    )?;
    Ok(Arc::new(client))
  } else {
    let client = OllamaClient::new(cfg.ollama.url.clone(), cfg.ollama.model.clone(), timeout)?;
    Ok(Arc::new(client))
  }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
  reqwest::Client::builder()
    .timeout(timeout)
    .build()
    .map_err(|e| ProviderError::Request(format!("HTTP client init failed: {e}")))
}

/// Turn a non-2xx response into a `ProviderError::Status`, preferring the
/// backend's own error message when the body carries one.
pub(crate) async fn status_error(res: reqwest::Response) -> ProviderError {
  let status = res.status();
  let body = res.text().await.unwrap_or_default();
  let message = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
  ProviderError::Status { status: status.as_u16(), message }
}

// --- Ollama ---

#[derive(Clone)]
pub struct OllamaClient {
  client: reqwest::Client,
  url: String,
  model: String,
  timeout_secs: u64,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
  model: &'a str,
  prompt: &'a str,
  stream: bool,
  format: &'a str,
  options: OllamaOptions,
}
#[derive(Serialize)]
struct OllamaOptions { temperature: f32 }

#[derive(Deserialize)]
struct OllamaGenerateResponse { response: String }

impl OllamaClient {
  pub fn new(url: String, model: String, timeout: Duration) -> Result<Self, ProviderError> {
    Ok(Self { client: http_client(timeout)?, url, model, timeout_secs: timeout.as_secs() })
  }
}

#[async_trait]
impl ModelClient for OllamaClient {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
    let req = OllamaGenerateRequest {
      model: &self.model,
      prompt,
      stream: false,
      format: "json",
      options: OllamaOptions { temperature },
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&self.url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await
      .map_err(|e| ProviderError::from_reqwest(e, self.timeout_secs))?;

    if !res.status().is_success() {
      return Err(status_error(res).await);
    }

    let body: OllamaGenerateResponse = res.json().await
      .map_err(|e| ProviderError::Envelope(e.to_string()))?;
    info!(target: "quiz_backend", elapsed = ?start.elapsed(), response_len = body.response.len(), "Ollama response received");
    debug!(target: "quiz_backend", raw = %trunc_for_log(&body.response, 500), "Ollama raw output");
    Ok(body.response)
  }

  fn describe(&self) -> String {
    format!("ollama({} @ {})", self.model, self.url)
  }
}

// --- Groq (OpenAI-compatible chat completions) ---

#[derive(Clone)]
pub struct GroqClient {
  client: reqwest::Client,
  api_url: String,
  model: String,
  api_key: String,
  max_completion_tokens: u32,
  timeout_secs: u64,
}

impl GroqClient {
  pub fn new(
    api_url: String,
    model: String,
    api_key: String,
    max_completion_tokens: u32,
    timeout: Duration,
  ) -> Result<Self, ProviderError> {
    Ok(Self {
      client: http_client(timeout)?,
      api_url,
      model,
      api_key,
      max_completion_tokens,
      timeout_secs: timeout.as_secs(),
    })
  }
}

#[async_trait]
impl ModelClient for GroqClient {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
    let req = ChatCompletionRequest {
      model: &self.model,
      messages: vec![ChatMessageReq { role: "user", content: prompt }],
      temperature,
      max_completion_tokens: Some(self.max_completion_tokens),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&self.api_url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| ProviderError::from_reqwest(e, self.timeout_secs))?;

    if !res.status().is_success() {
      return Err(status_error(res).await);
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| ProviderError::Envelope(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(target: "quiz_backend", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Groq usage");
    }
    let text = assistant_content(body)?;
    info!(target: "quiz_backend", elapsed = ?start.elapsed(), response_len = text.len(), "Groq response received");
    Ok(text)
  }

  fn describe(&self) -> String {
    format!("groq({})", self.model)
  }
}

/// Pull the first assistant message out of a chat completion envelope.
fn assistant_content(body: ChatCompletionResponse) -> Result<String, ProviderError> {
  body.choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| ProviderError::Envelope("no assistant content in choices".into()))
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_completion_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
