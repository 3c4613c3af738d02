//! Structural contract for a generated question.
//!
//! Rules are checked in order and the first failure wins. The error text is
//! written so it can be shown to the model verbatim on the next attempt.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::CandidateQuestion;
use crate::error::ValidationError;

const REQUIRED_FIELDS: [&str; 6] = [
    "question_id",
    "question_text",
    "options",
    "correct_option_index",
    "hint",
    "explanation",
];

/// Parse cleaned model text and validate it.
pub fn parse_and_validate(cleaned: &str) -> Result<CandidateQuestion, ValidationError> {
    let value: Value = serde_json::from_str(cleaned).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
    validate(&value)
}

pub fn validate(value: &Value) -> Result<CandidateQuestion, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            return Err(ValidationError::MissingField(field));
        }
    }

    let question_id = non_empty_string(obj, "question_id")?;
    let question_text = non_empty_string(obj, "question_text")?;

    let raw_options = obj
        .get("options")
        .and_then(Value::as_array)
        .filter(|a| a.len() == 4)
        .ok_or(ValidationError::OptionCount)?;
    let mut options: [String; 4] = Default::default();
    for (slot, raw) in options.iter_mut().zip(raw_options) {
        let text = raw.as_str().ok_or(ValidationError::OptionNotString)?;
        *slot = strip_option_prefix(text);
    }

    let correct_option_index = correct_index(obj.get("correct_option_index"))?;

    let hint = non_empty_string(obj, "hint")?;
    let explanation = non_empty_string(obj, "explanation")?;

    let code_context = match obj.get("code_context") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => return Err(ValidationError::CodeContextType(json_type_name(other))),
    };

    Ok(CandidateQuestion {
        question_id,
        question_text,
        options,
        correct_option_index,
        hint,
        explanation,
        code_context,
    })
}

/// Check a question that did not come straight from the model (e.g. a cached
/// prefetch) still honors the index and option invariants.
pub fn revalidate(q: &CandidateQuestion) -> Result<(), ValidationError> {
    if q.correct_option_index > 3 {
        return Err(ValidationError::IndexOutOfRange(i64::from(q.correct_option_index)));
    }
    if q.question_text.trim().is_empty() {
        return Err(ValidationError::EmptyString("question_text"));
    }
    Ok(())
}

fn non_empty_string(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(ValidationError::EmptyString(field)),
    }
}

fn correct_index(raw: Option<&Value>) -> Result<u8, ValidationError> {
    let value = raw.ok_or(ValidationError::MissingField("correct_option_index"))?;
    let mut idx = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .ok_or(ValidationError::IndexNotInteger("float"))?,
        other => return Err(ValidationError::IndexNotInteger(json_type_name(other))),
    };

    // Known model quirk: -1 for "no answer". Rewritten to the first option
    // without re-deriving the answer; kept for compatibility.
    if idx == -1 {
        warn!(target: "quiz", "correct_option_index was -1, coercing to 0");
        idx = 0;
    }

    match idx {
        0..=3 => Ok(idx as u8),
        _ => Err(ValidationError::IndexOutOfRange(idx)),
    }
}

fn option_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:option\s+[a-d]\s*[:.)]\s*|\([a-d]\)\s*|[a-d][.)]\s+)")
            .expect("option prefix pattern is valid")
    })
}

/// Remove "Option A:", "(A)", "A.", "A)" style prefixes. Repeats until stable
/// so that re-validating a cleaned question changes nothing.
fn strip_option_prefix(option: &str) -> String {
    let mut s = option.trim().to_string();
    loop {
        let next = option_prefix().replace(&s, "").trim().to_string();
        if next == s || next.is_empty() {
            return s;
        }
        s = next;
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
