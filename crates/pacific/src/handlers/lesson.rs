//! Lesson generation endpoint handler

use axum::{
  extract::{rejection::JsonRejection, Extension, State},
  Json,
};

use lessons::{LessonEnvelope, LessonResponse, Stage};

use super::canonical_request;
use crate::middleware::RequestContext;
use crate::state::AppState;
use crate::types::ApiFailure;

/// POST /lesson, POST /api/ai/generate-lesson
pub async fn generate_lesson(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<LessonEnvelope>, JsonRejection>,
) -> Result<Json<LessonResponse>, ApiFailure> {
  let (profile, request) = canonical_request(&context, payload)?;

  match state.generate_lesson(&profile, &request).await {
    Ok(outcome) => {
      let source = if outcome.visited(Stage::CacheHit) {
        "cache"
      } else if outcome.visited(Stage::Fallback) {
        "fallback"
      } else {
        "generated"
      };
      context.log_info(&format!(
        "lesson {} for {} / {} served from {source}",
        outcome.fingerprint, request.target_language, request.topic
      ));
      Ok(Json(outcome.response))
    }
    Err(e) => {
      context.log_error(&format!("lesson generation failed: {e}"));
      Err(ApiFailure::from(&e))
    }
  }
}
