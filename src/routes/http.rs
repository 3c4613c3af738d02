//! HTTP endpoint handlers. These are thin wrappers that forward to the quiz service.
//! Each handler is instrumented and logs request parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{GenerationRequest, MAX_LEVEL, MIN_LEVEL};
use crate::error::GenerationError;
use crate::protocol::*;
use crate::state::AppState;

/// Handler failure rendered as `{status: "error", detail}`.
#[derive(Debug)]
pub enum ApiError {
  BadRequest(String),
  Generation(GenerationError),
}

impl From<GenerationError> for ApiError {
  fn from(e: GenerationError) -> Self { ApiError::Generation(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, detail) = match self {
      ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
      ApiError::Generation(e @ GenerationError::Exhausted { .. }) => (StatusCode::BAD_GATEWAY, e.to_string()),
      ApiError::Generation(e) => {
        error!(target: "quiz_backend", kind = e.kind(), error = %e, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(ErrorOut { status: "error".into(), detail })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { status: "healthy".into() })
}

#[instrument(
  level = "info",
  skip(state, body),
  fields(domain = %body.domain_name, program = %body.program_name, level = body.level, history_len = body.history.len())
)]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizIn>,
) -> Result<Json<QuizOut>, ApiError> {
  let req = into_request(body)?;
  let session_id = req.session_id.clone();

  match state.service.next_question(req).await {
    Ok(generated) => {
      info!(target: "quiz_backend", %session_id, attempts_used = generated.attempts, "Quiz question served");
      Ok(Json(to_out(session_id, generated)))
    }
    Err(e) => {
      warn!(target: "quiz_backend", %session_id, kind = e.kind(), "Quiz generation failed");
      Err(e.into())
    }
  }
}

fn into_request(body: QuizIn) -> Result<GenerationRequest, ApiError> {
  if body.domain_name.trim().is_empty() || body.program_name.trim().is_empty() {
    return Err(ApiError::BadRequest("domain_name and program_name must be non-empty".into()));
  }
  let level = u8::try_from(body.level)
    .ok()
    .filter(|l| (MIN_LEVEL..=MAX_LEVEL).contains(l))
    .ok_or_else(|| ApiError::BadRequest(format!("level must be between {MIN_LEVEL} and {MAX_LEVEL}, got {}", body.level)))?;
  let session_id = body
    .session_id
    .filter(|s| !s.trim().is_empty())
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  Ok(GenerationRequest {
    domain_name: body.domain_name,
    program_name: body.program_name,
    level,
    session_id,
    history: body.history,
  })
}
