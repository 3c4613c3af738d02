//! Public protocol structs for the HTTP endpoints (serde ready).
//! Field names follow what the quiz frontend already consumes.

use serde::{Deserialize, Serialize};

use crate::domain::{CandidateQuestion, GeneratedQuestion, HistoryEntry};

/// Body of `POST /quiz`.
#[derive(Debug, Deserialize)]
pub struct QuizIn {
    pub domain_name: String,
    pub program_name: String,
    pub level: i64,
    /// Generated when absent; echoed back so the client can keep the session.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuizOut {
    pub status: String,
    pub session_id: String,
    pub attempts_used: u32,
    pub data: QuestionOut,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionOut {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: u8,
    pub hint: String,
    pub code_context: Option<String>,
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthOut {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub status: String,
    pub detail: String,
}

impl From<CandidateQuestion> for QuestionOut {
    fn from(q: CandidateQuestion) -> Self {
        Self {
            id: q.question_id,
            question: q.question_text,
            options: q.options.into(),
            correct_index: q.correct_option_index,
            hint: q.hint,
            code_context: q.code_context,
            explanation: q.explanation,
        }
    }
}

/// Map a generated question into the response envelope.
pub fn to_out(session_id: String, generated: GeneratedQuestion) -> QuizOut {
    QuizOut {
        status: "success".into(),
        session_id,
        attempts_used: generated.attempts,
        data: generated.question.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_uses_frontend_field_names() {
        let q = CandidateQuestion {
            question_id: "q1".into(),
            question_text: "What is a list?".into(),
            options: ["A".into(), "B".into(), "C".into(), "D".into()],
            correct_option_index: 2,
            hint: "h".into(),
            explanation: "e".into(),
            code_context: Some("x = []".into()),
        };
        let out = to_out("s1".into(), GeneratedQuestion { question: q, attempts: 3 });
        let v = serde_json::to_value(&out).expect("serialize");
        assert_eq!(
            v,
            json!({
                "status": "success",
                "session_id": "s1",
                "attempts_used": 3,
                "data": {
                    "id": "q1",
                    "question": "What is a list?",
                    "options": ["A", "B", "C", "D"],
                    "correctIndex": 2,
                    "hint": "h",
                    "code_context": "x = []",
                    "explanation": "e"
                }
            })
        );
    }

    #[test]
    fn request_defaults_session_and_history() {
        let body: QuizIn =
            serde_json::from_str(r#"{"domain_name":"Python","program_name":"Data Structures","level":2}"#)
                .expect("parse");
        assert!(body.session_id.is_none());
        assert!(body.history.is_empty());
    }
}
