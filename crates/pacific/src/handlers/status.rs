//! Status, version and schema endpoint handlers

use axum::{extract::State, Json};
use chrono::Utc;
use schemars::schema_for;
use serde_json::{json, Value};
use tracing::warn;

use lessons::{ErrorResponse, LessonEnvelope, LessonResponse};

use crate::profiles::{ProfileUpdate, StoredProfile};
use crate::state::AppState;
use crate::types::{CacheStatsBody, ComponentStatus, HealthResponse, VersionResponse};

const SYSTEM_NAME: &str = "PACIFIC Backend";

/// GET /health - liveness plus cache statistics
///
/// Always answers 200; a failing store shows up as `status: "degraded"`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
  let version = env!("CARGO_PKG_VERSION").to_string();
  let fallback_enabled = state.fallback.is_some();

  let response = match state.cache().stats().await {
    Ok(stats) => HealthResponse {
      system: SYSTEM_NAME.to_string(),
      status: "healthy".to_string(),
      version,
      timestamp: Utc::now(),
      fallback_enabled,
      components: ComponentStatus {
        cache: "operational".to_string(),
        ai_generator: "operational".to_string(),
        integration: "operational".to_string(),
      },
      cache_stats: Some(CacheStatsBody::new(stats, state.storage.clone())),
      error: None,
    },
    Err(e) => {
      warn!(error = %e, "health check could not read cache statistics");
      HealthResponse {
        system: SYSTEM_NAME.to_string(),
        status: "degraded".to_string(),
        version,
        timestamp: Utc::now(),
        fallback_enabled,
        components: ComponentStatus {
          cache: "unavailable".to_string(),
          ai_generator: "operational".to_string(),
          integration: "operational".to_string(),
        },
        cache_stats: None,
        error: Some(e.to_string()),
      }
    }
  };

  Json(response)
}

/// GET /version - Returns current API version
pub async fn version() -> Json<VersionResponse> {
  Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() })
}

/// GET /api/schema - JSON schemas of the request and response bodies
pub async fn schema() -> Json<Value> {
  Json(json!({
    "lessonEnvelope": schema_for!(LessonEnvelope),
    "lessonResponse": schema_for!(LessonResponse),
    "errorResponse": schema_for!(ErrorResponse),
    "profileUpdate": schema_for!(ProfileUpdate),
    "profile": schema_for!(StoredProfile),
  }))
}
