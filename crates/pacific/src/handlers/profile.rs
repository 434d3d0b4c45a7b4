//! Profile endpoint handlers

use axum::{
  extract::{rejection::JsonRejection, Extension, State},
  http::StatusCode,
  Json,
};

use super::INVALID_JSON;
use crate::middleware::RequestContext;
use crate::profiles::{ProfileUpdate, StoredProfile};
use crate::state::AppState;
use crate::types::ApiFailure;

/// GET /profile - profile of the `user-id` header's user
pub async fn get_profile(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> Result<Json<StoredProfile>, ApiFailure> {
  let user_id = context.user_id();
  match state.profiles.get(user_id).await {
    Ok(Some(profile)) => Ok(Json(profile)),
    Ok(None) => Err(ApiFailure::not_found("Profile not found")),
    Err(e) => {
      context.log_error(&format!("failed to load profile {user_id}: {e}"));
      Err(e.into())
    }
  }
}

/// POST /profile - create or replace the caller's profile
pub async fn save_profile(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredProfile>), ApiFailure> {
  let Json(update) = payload.map_err(|_| ApiFailure::invalid_input(INVALID_JSON))?;
  let user_id = context.user_id();

  match state.profiles.upsert(user_id, update).await {
    Ok(profile) => {
      context.log_info(&format!("saved profile {user_id}"));
      Ok((StatusCode::CREATED, Json(profile)))
    }
    Err(e) => {
      context.log_error(&format!("failed to save profile {user_id}: {e}"));
      Err(e.into())
    }
  }
}
