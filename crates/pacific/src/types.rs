//! REST API types with schemars annotations for schema generation

use axum::{
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lessons::{ErrorCode, ErrorResponse, LessonError, StoreStats};

use crate::profiles::ProfileError;

// Failures
// ========

/// Error half of every handler result, rendered as the failure envelope
#[derive(Debug)]
pub struct ApiFailure {
  pub status: StatusCode,
  pub body: ErrorResponse,
}

pub fn status_for(code: ErrorCode) -> StatusCode {
  match code {
    ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
    ErrorCode::NotFound => StatusCode::NOT_FOUND,
    ErrorCode::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
    ErrorCode::GenerationTimeout => StatusCode::GATEWAY_TIMEOUT,
    ErrorCode::InvalidGenerationRequest | ErrorCode::GenerationFailed => StatusCode::BAD_GATEWAY,
    ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ApiFailure {
  pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
    Self { status: status_for(code), body: ErrorResponse::new(message, code) }
  }

  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::new(message, ErrorCode::InvalidInput)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(message, ErrorCode::NotFound)
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::new(message, ErrorCode::Internal)
  }
}

impl From<&LessonError> for ApiFailure {
  fn from(error: &LessonError) -> Self {
    let body = ErrorResponse::from(error);
    Self { status: status_for(body.error_code), body }
  }
}

impl From<ProfileError> for ApiFailure {
  fn from(error: ProfileError) -> Self {
    match error {
      ProfileError::InvalidUserId(_) => Self::invalid_input(error.to_string()),
      other => Self::internal(other.to_string()),
    }
  }
}

impl IntoResponse for ApiFailure {
  fn into_response(self) -> Response {
    (self.status, Json(self.body)).into_response()
  }
}

// Status Endpoints
// ================

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
  pub cache: String,
  pub ai_generator: String,
  pub integration: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsBody {
  pub total_cached_lessons: usize,
  pub cache_size_bytes: u64,
  pub storage: String,
}

impl CacheStatsBody {
  pub fn new(stats: StoreStats, storage: impl Into<String>) -> Self {
    Self {
      total_cached_lessons: stats.entry_count,
      cache_size_bytes: stats.size_bytes,
      storage: storage.into(),
    }
  }
}

/// Response for /health endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
  pub system: String,
  /// "healthy" or "degraded"
  pub status: String,
  pub version: String,
  pub timestamp: DateTime<Utc>,
  pub fallback_enabled: bool,
  pub components: ComponentStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cache_stats: Option<CacheStatsBody>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

// Admin Endpoints
// ===============

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SweepResponse {
  pub success: bool,
  /// Entries removed by this sweep
  pub removed: usize,
}

// Simulation Endpoints
// ====================

/// `{ success: true, data }` wrapper for simulation payloads
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimulationResponse<T> {
  pub success: bool,
  pub data: T,
}

impl<T> SimulationResponse<T> {
  pub fn success(data: T) -> Self {
    Self { success: true, data }
  }
}
