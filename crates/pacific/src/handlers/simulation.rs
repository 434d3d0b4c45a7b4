//! Conversation simulation endpoint handlers

use axum::{
  extract::{rejection::JsonRejection, Extension},
  Json,
};

use lessons::simulation::{
  continue_dialogue, generate_dialogue, generate_scenario, ContinuationResponse, DialogueResponse,
  ScenarioResponse,
};
use lessons::LessonEnvelope;

use super::canonical_request;
use crate::middleware::RequestContext;
use crate::types::{ApiFailure, SimulationResponse};

/// POST /api/ai/generate-scenario
pub async fn scenario(
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<LessonEnvelope>, JsonRejection>,
) -> Result<Json<SimulationResponse<ScenarioResponse>>, ApiFailure> {
  let (_, request) = canonical_request(&context, payload)?;
  let scenario = generate_scenario(&request);
  context.log_info(&format!("scenario '{}' for {}", scenario.scenario.title, request.target_language));
  Ok(Json(SimulationResponse::success(scenario)))
}

/// POST /api/ai/generate-dialogue
pub async fn dialogue(
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<LessonEnvelope>, JsonRejection>,
) -> Result<Json<SimulationResponse<DialogueResponse>>, ApiFailure> {
  let (_, request) = canonical_request(&context, payload)?;
  Ok(Json(SimulationResponse::success(generate_dialogue(&request))))
}

/// POST /api/ai/continue-dialogue
pub async fn continue_conversation(
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<LessonEnvelope>, JsonRejection>,
) -> Result<Json<SimulationResponse<ContinuationResponse>>, ApiFailure> {
  let (_, request) = canonical_request(&context, payload)?;
  Ok(Json(SimulationResponse::success(continue_dialogue(&request))))
}
