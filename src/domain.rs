//! Domain models: history entries, generation requests, and candidate questions.

use serde::{Deserialize, Serialize};

/// Lowest and highest difficulty levels.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// A previously asked question.
///
/// Entries persisted by the generator carry `options` and `correct_option_index`;
/// entries supplied by the caller carry `user_answer` and `was_correct`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub question_text: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_option_index: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub was_correct: Option<bool>,
}

impl HistoryEntry {
  /// Missing flags count as incorrect.
  pub fn is_correct(&self) -> bool {
    self.was_correct.unwrap_or(false)
  }
}

/// One call into the generator. Immutable once built.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub domain_name: String,
  pub program_name: String,
  pub level: u8,
  pub session_id: String,
  pub history: Vec<HistoryEntry>,
}

/// A question that passed schema validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuestion {
  pub question_id: String,
  pub question_text: String,
  pub options: [String; 4],
  pub correct_option_index: u8,
  pub hint: String,
  pub explanation: String,
  #[serde(default)]
  pub code_context: Option<String>,
}

impl CandidateQuestion {
  /// The text of the option marked correct.
  pub fn correct_option(&self) -> Option<&str> {
    self.options.get(self.correct_option_index as usize).map(String::as_str)
  }
}

/// A question accepted by the generator together with the attempt it took.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedQuestion {
  pub question: CandidateQuestion,
  pub attempts: u32,
}

/// Human label for a difficulty level, rendered into the prompt.
pub fn level_description(level: u8) -> &'static str {
  match level {
    1 => "Basics (Definitions & Terminology)",
    2 => "Easy (Simple Concepts)",
    3 => "Medium (Application & Logic)",
    4 => "Hard (Complex Scenarios & Optimization)",
    5 => "Certification (Comprehensive Mixed Assessment)",
    _ => "General",
  }
}
