//! Session history store.
//!
//! The generator only reads a session's history and appends accepted
//! questions; retention is the store's concern.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::HistoryEntry;
use crate::error::HistoryError;

#[async_trait]
pub trait HistoryStore: Send + Sync {
  /// Ordered history for a session; empty if the session is unknown.
  async fn load(&self, session_id: &str) -> Result<Vec<HistoryEntry>, HistoryError>;

  /// Append one asked question, creating the session if missing.
  async fn append(
    &self,
    session_id: &str,
    question_text: &str,
    options: &[String],
    correct_option_index: u8,
  ) -> Result<(), HistoryError>;
}

/// Process-local store. Appends are atomic under the write lock.
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
  sessions: Arc<RwLock<HashMap<String, Vec<HistoryEntry>>>>,
}

impl InMemoryHistoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
  #[instrument(level = "debug", skip(self))]
  async fn load(&self, session_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
    Ok(self.sessions.read().await.get(session_id).cloned().unwrap_or_default())
  }

  #[instrument(level = "debug", skip(self, question_text, options), fields(text_len = question_text.len()))]
  async fn append(
    &self,
    session_id: &str,
    question_text: &str,
    options: &[String],
    correct_option_index: u8,
  ) -> Result<(), HistoryError> {
    let mut sessions = self.sessions.write().await;
    let entries = sessions.entry(session_id.to_string()).or_default();
    entries.push(HistoryEntry {
      question_text: question_text.to_string(),
      options: options.to_vec(),
      correct_option_index: Some(correct_option_index),
      ..Default::default()
    });
    debug!(target: "quiz", %session_id, len = entries.len(), "History appended");
    Ok(())
  }
}
