//! Service configuration: optional TOML file plus environment overrides.
//!
//! Resolution order: built-in defaults → `QUIZ_CONFIG_PATH` TOML (if set and
//! parseable) → environment variables. See `AppConfig` for the schema.

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::prompt::QUIZ_PROMPT_TEMPLATE;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("USE_GROQ is enabled but no Groq API key is configured (GROQ_API_KEY)")]
  MissingGroqKey,
  #[error("embeddings provider 'openai' requires an API key (EMBEDDINGS_API_KEY)")]
  MissingEmbeddingsKey,
  #[error("invalid value for {key}: {value}")]
  InvalidEnv { key: &'static str, value: String },
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub backend: BackendConfig,
  pub ollama: OllamaConfig,
  pub groq: GroqConfig,
  pub embeddings: EmbeddingsConfig,
  pub history: HistoryConfig,
  pub prefetch: PrefetchConfig,
  pub prompts: Prompts,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub port: u16,
}

impl Default for ServerConfig {
  fn default() -> Self { Self { port: 8000 } }
}

/// Which generation backend is active. Fixed for the life of the process.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
  pub use_groq: bool,
  /// Hard ceiling for one backend HTTP call.
  pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
  fn default() -> Self { Self { use_groq: false, request_timeout_secs: 30 } }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
  pub url: String,
  pub model: String,
}

impl Default for OllamaConfig {
  fn default() -> Self {
    Self {
      url: "http://localhost:11434/api/generate".into(),
      model: "phi3".into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
  pub api_url: String,
  pub model: String,
  pub api_key: Option<String>,
  pub max_completion_tokens: u32,
}

impl Default for GroqConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.groq.com/openai/v1/chat/completions".into(),
      model: "mixtral-8x7b-32768".into(),
      api_key: None,
      max_completion_tokens: 2000,
    }
  }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingsProvider {
  /// Ollama `/api/embed`.
  Ollama,
  /// OpenAI-compatible `/embeddings`.
  Openai,
  /// Offline token-hash vectors; no network.
  Hashing,
}

impl std::str::FromStr for EmbeddingsProvider {
  type Err = ();
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "ollama" => Ok(Self::Ollama),
      "openai" => Ok(Self::Openai),
      "hashing" => Ok(Self::Hashing),
      _ => Err(()),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
  pub provider: EmbeddingsProvider,
  /// Base URL: Ollama host, or OpenAI-compatible API base (".../v1").
  pub url: String,
  pub model: String,
  pub api_key: Option<String>,
  /// Vector size for the hashing provider.
  pub dimensions: usize,
}

impl Default for EmbeddingsConfig {
  fn default() -> Self {
    Self {
      provider: EmbeddingsProvider::Ollama,
      url: "http://localhost:11434".into(),
      // all-MiniLM-L6-v2 as packaged by Ollama
      model: "all-minilm".into(),
      api_key: None,
      dimensions: 256,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
  /// Ceiling for one load/append call against the history store.
  pub timeout_secs: u64,
}

impl Default for HistoryConfig {
  fn default() -> Self { Self { timeout_secs: 10 } }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
  pub enabled: bool,
  /// Maximum prefetch jobs running at once across all sessions.
  pub max_concurrent: usize,
}

impl Default for PrefetchConfig {
  fn default() -> Self { Self { enabled: true, max_concurrent: 4 } }
}

/// Prompt templates. Placeholders: `{domain_name}`, `{program_name}`,
/// `{level_description}`, `{level_int}`, `{history_json}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self { quiz_template: QUIZ_PROMPT_TEMPLATE.to_string() }
  }
}

impl AppConfig {
  /// Defaults, then TOML from QUIZ_CONFIG_PATH, then env overrides, then checks.
  pub fn load() -> Result<Self, ConfigError> {
    let mut cfg = load_toml_from_env().unwrap_or_default();
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.check()?;
    info!(
      target: "quiz_backend",
      backend = if cfg.backend.use_groq { "groq" } else { "ollama" },
      embeddings = ?cfg.embeddings.provider,
      prefetch = cfg.prefetch.enabled,
      "Configuration resolved"
    );
    Ok(cfg)
  }

  /// Apply overrides from an env-like lookup. Split out so tests don't touch the process env.
  pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(v) = get("PORT") {
      self.server.port = v.parse().map_err(|_| ConfigError::InvalidEnv { key: "PORT", value: v.clone() })?;
    }
    if let Some(v) = get("USE_GROQ") {
      self.backend.use_groq = v.trim().eq_ignore_ascii_case("true");
    }
    if let Some(v) = get("GROQ_API_KEY").filter(|v| !v.trim().is_empty()) {
      self.groq.api_key = Some(v);
    }
    if let Some(v) = get("GROQ_MODEL") { self.groq.model = v; }
    if let Some(v) = get("GROQ_API_URL") { self.groq.api_url = v; }
    if let Some(v) = get("OLLAMA_URL") { self.ollama.url = v; }
    if let Some(v) = get("OLLAMA_MODEL") { self.ollama.model = v; }
    if let Some(v) = get("EMBEDDINGS_PROVIDER") {
      self.embeddings.provider = v
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key: "EMBEDDINGS_PROVIDER", value: v.clone() })?;
    }
    if let Some(v) = get("EMBEDDINGS_URL") { self.embeddings.url = v; }
    if let Some(v) = get("EMBEDDINGS_MODEL") { self.embeddings.model = v; }
    if let Some(v) = get("EMBEDDINGS_API_KEY").filter(|v| !v.trim().is_empty()) {
      self.embeddings.api_key = Some(v);
    }
    Ok(())
  }

  fn check(&self) -> Result<(), ConfigError> {
    if self.backend.use_groq && self.groq.api_key.is_none() {
      return Err(ConfigError::MissingGroqKey);
    }
    if self.embeddings.provider == EmbeddingsProvider::Openai && self.embeddings.api_key.is_none() {
      return Err(ConfigError::MissingEmbeddingsKey);
    }
    Ok(())
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
fn load_toml_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quiz_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quiz_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
        None
      }
    },
    Err(e) => {
      error!(target: "quiz_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_select_ollama() {
    let cfg = AppConfig::default();
    assert!(!cfg.backend.use_groq);
    assert_eq!(cfg.ollama.model, "phi3");
    assert_eq!(cfg.backend.request_timeout_secs, 30);
    assert!(cfg.prompts.quiz_template.contains("{history_json}"));
    assert!(cfg.check().is_ok());
  }

  #[test]
  fn toml_sections_are_partial() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [backend]
        use_groq = true
        [groq]
        api_key = "k"
        [prefetch]
        max_concurrent = 2
      "#,
    ).expect("toml");
    assert!(cfg.backend.use_groq);
    assert_eq!(cfg.backend.request_timeout_secs, 30);
    assert_eq!(cfg.groq.model, "mixtral-8x7b-32768");
    assert_eq!(cfg.prefetch.max_concurrent, 2);
    assert!(cfg.prefetch.enabled);
    assert!(cfg.check().is_ok());
  }

  #[test]
  fn env_overrides_win() {
    let mut cfg = AppConfig::default();
    cfg.apply_env(env(&[
      ("USE_GROQ", "TRUE"),
      ("GROQ_API_KEY", "secret"),
      ("OLLAMA_MODEL", "llama3"),
      ("PORT", "9001"),
      ("EMBEDDINGS_PROVIDER", "hashing"),
    ])).expect("env");
    assert!(cfg.backend.use_groq);
    assert_eq!(cfg.groq.api_key.as_deref(), Some("secret"));
    assert_eq!(cfg.ollama.model, "llama3");
    assert_eq!(cfg.server.port, 9001);
    assert_eq!(cfg.embeddings.provider, EmbeddingsProvider::Hashing);
  }

  #[test]
  fn groq_without_key_is_rejected() {
    let mut cfg = AppConfig::default();
    cfg.apply_env(env(&[("USE_GROQ", "true"), ("GROQ_API_KEY", "  ")])).expect("env");
    assert!(matches!(cfg.check(), Err(ConfigError::MissingGroqKey)));
  }

  #[test]
  fn bad_port_is_an_error() {
    let mut cfg = AppConfig::default();
    let err = cfg.apply_env(env(&[("PORT", "http")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { key: "PORT", .. }));
  }
}
