//! Adaptive Quiz · Question Generation Backend
//!
//! - Axum HTTP API (`POST /quiz`, `GET /health`)
//! - One text-generation backend, chosen at startup (local Ollama or hosted Groq)
//! - Background prefetch of the next question per session
//!
//! Important env variables:
//!   PORT                : u16 (default 8000)
//!   QUIZ_CONFIG_PATH    : path to TOML config (backends, embeddings, prefetch, prompts)
//!   USE_GROQ            : "true" selects the hosted Groq backend instead of Ollama
//!   GROQ_API_KEY        : required when USE_GROQ=true
//!   GROQ_MODEL          : default "mixtral-8x7b-32768"
//!   OLLAMA_URL          : default "http://localhost:11434/api/generate"
//!   OLLAMA_MODEL        : default "phi3"
//!   EMBEDDINGS_PROVIDER : "ollama" (default), "openai" or "hashing"
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod prompt;
mod llm;
mod sanitize;
mod validate;
mod embedding;
mod dedup;
mod difficulty;
mod history;
mod orchestrator;
mod prefetch;
mod service;
mod state;
mod protocol;
mod routes;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::load()?;

  // Build shared application state (history store, model client, embedder, prefetch pool).
  let state = Arc::new(AppState::new(&cfg)?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quiz_backend", "HTTP server stopped");
  Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!(target: "quiz_backend", error = %e, "Failed to install Ctrl-C handler");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => { sig.recv().await; }
      Err(e) => {
        warn!(target: "quiz_backend", error = %e, "Failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };
  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!(target: "quiz_backend", "Shutdown signal received");
}
