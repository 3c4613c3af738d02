//! Error taxonomy for the generation pipeline.
//!
//! Everything except `GenerationError::Exhausted` and a failed history load is
//! retryable inside the attempt loop; the `Display` text of a retryable error is
//! what gets fed back into the next prompt.

use thiserror::Error;

/// Text-generation or embedding backend failures.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend timed out after {0} seconds")]
    Timeout(u64),

    #[error("backend HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Envelope(String),
}

impl ProviderError {
    /// Map a transport error, keeping timeouts distinguishable.
    pub fn from_reqwest(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

/// Out-of-contract model output. Messages are written for the model to read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("response must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0} must be a non-empty string")]
    EmptyString(&'static str),

    #[error("options must be exactly 4 items")]
    OptionCount,

    #[error("all options must be strings")]
    OptionNotString,

    #[error("correct_option_index must be an integer, got {0}")]
    IndexNotInteger(&'static str),

    #[error("correct_option_index must be 0-3, got {0}")]
    IndexOutOfRange(i64),

    #[error("code_context must be string or null, got {0}")]
    CodeContextType(&'static str),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DuplicateError {
    #[error("Exact duplicate question")]
    Exact,

    #[error("Semantic duplicate question (similarity {similarity:.2})")]
    Semantic { similarity: f32 },
}

#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),

    #[error("history store timed out after {0} seconds")]
    Timeout(u64),
}

/// Outcome of one generation cycle (or one attempt inside it).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Failed after {attempts} retries: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// A consumed prefetch entry failed re-validation. Handled internally.
    #[error("cached question failed re-validation: {0}")]
    CacheStale(String),
}

impl GenerationError {
    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Provider(_) => "provider",
            GenerationError::Validation(_) => "validation",
            GenerationError::Duplicate(_) => "duplicate",
            GenerationError::History(_) => "history",
            GenerationError::Exhausted { .. } => "exhausted",
            GenerationError::CacheStale(_) => "cache_stale",
        }
    }
}
