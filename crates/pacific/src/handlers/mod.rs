//! Endpoint handlers

pub mod admin;
pub mod lesson;
pub mod profile;
pub mod simulation;
pub mod status;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use lessons::{LearnerProfile, LessonEnvelope, LessonError, LessonRequest};

use crate::middleware::RequestContext;
use crate::types::ApiFailure;

pub const INVALID_JSON: &str = "Invalid JSON in request body";

/// Parse and validate a `{ userProfile, lessonRequest }` body
pub(crate) fn canonical_request(
  context: &RequestContext,
  payload: Result<Json<LessonEnvelope>, JsonRejection>,
) -> Result<(LearnerProfile, LessonRequest), ApiFailure> {
  let Json(envelope) = payload.map_err(|rejection| {
    context.log_warn(&format!("rejected body: {rejection}"));
    ApiFailure::invalid_input(INVALID_JSON)
  })?;

  envelope.canonicalize().map_err(|e| {
    context.log_warn(&format!("validation failed: {e}"));
    ApiFailure::from(&LessonError::from(e))
  })
}
