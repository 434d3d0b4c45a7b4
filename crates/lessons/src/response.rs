//! Uniform response envelopes

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::GeneratedLesson;
use crate::errors::LessonError;
use crate::generation::GenerationError;
use crate::model::LearningPhase;
use crate::priorities::TimeAllocation;
use crate::store::StoreStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
  pub success: bool,
  pub data: LessonData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonData {
  pub lesson_content: Value,
  pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
  pub cached: bool,
  pub timestamp: DateTime<Utc>,
  pub generated_with: String,
  pub priority_focus: Vec<String>,
  pub phase_optimized: LearningPhase,
  pub moscow_enabled: bool,
  pub time_allocation: TimeAllocation,
  #[serde(default, skip_serializing_if = "is_false")]
  pub fallback: bool,
  /// Present on cache hits when the store could report its size
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache_stats: Option<StoreStats>,
}

fn is_false(value: &bool) -> bool {
  !*value
}

impl LessonResponse {
  pub fn from_lesson(lesson: &GeneratedLesson, cached: bool) -> Self {
    let metadata = &lesson.metadata;
    Self {
      success: true,
      data: LessonData {
        lesson_content: lesson.lesson_content.clone(),
        metadata: ResponseMetadata {
          cached,
          timestamp: metadata.timestamp,
          generated_with: metadata.model_used.clone(),
          priority_focus: metadata.priority_focus.clone(),
          phase_optimized: metadata.phase_optimized,
          moscow_enabled: true,
          time_allocation: metadata.time_allocation,
          fallback: lesson.is_fallback(),
          cache_stats: None,
        },
      },
    }
  }

  pub fn with_cache_stats(mut self, stats: Option<StoreStats>) -> Self {
    self.data.metadata.cache_stats = stats;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
  InvalidInput,
  RateLimited,
  InvalidGenerationRequest,
  GenerationFailed,
  GenerationTimeout,
  NotFound,
  Internal,
}

impl ErrorCode {
  pub fn for_error(error: &LessonError) -> Self {
    match error {
      LessonError::Input(_) => ErrorCode::InvalidInput,
      LessonError::Generation(GenerationError::RateLimited { .. }) => ErrorCode::RateLimited,
      LessonError::Generation(GenerationError::InvalidRequest { .. }) => {
        ErrorCode::InvalidGenerationRequest
      }
      LessonError::Generation(GenerationError::Failed { .. }) => ErrorCode::GenerationFailed,
      LessonError::Generation(GenerationError::Timeout { .. }) => ErrorCode::GenerationTimeout,
      LessonError::Normalization { .. } | LessonError::Store(_) => ErrorCode::Internal,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
  pub success: bool,
  pub error: String,
  pub error_code: ErrorCode,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>, error_code: ErrorCode) -> Self {
    Self { success: false, error: error.into(), error_code }
  }
}

impl From<&LessonError> for ErrorResponse {
  fn from(error: &LessonError) -> Self {
    Self::new(error.to_string(), ErrorCode::for_error(error))
  }
}
