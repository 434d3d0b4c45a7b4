//! Degraded-mode lesson delivery
//!
//! When the primary pipeline fails in generation, [`FallbackLayer`] retries
//! once with a simplified request on the lightweight model and, if that also
//! fails, serves a hand-built lesson. Neither result is cached. Rate limits
//! are returned unchanged.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::content::{fallback_lesson_content, GeneratedLesson, LessonFormat, LessonMetadata};
use crate::errors::LessonError;
use crate::fingerprint::derive_key;
use crate::generation::{GenerationError, GenerationParams, GenerationService};
use crate::model::{LearnerProfile, LessonRequest};
use crate::orchestrator::{assemble_lesson, generate_within, LessonOrchestrator, LessonOutcome, Stage};
use crate::priorities::{compute_time_allocation, normalize_priorities, PriorityProfile};
use crate::prompt::build_lesson_prompt;
use crate::response::LessonResponse;

/// Model name recorded on hand-built lessons
pub const FALLBACK_MODEL: &str = "fallback";

pub struct FallbackLayer {
  primary: Arc<LessonOrchestrator>,
  retry_generator: Arc<dyn GenerationService>,
  retry_timeout: Duration,
}

impl FallbackLayer {
  pub fn new(
    primary: Arc<LessonOrchestrator>,
    retry_generator: Arc<dyn GenerationService>,
    retry_timeout: Duration,
  ) -> Self {
    Self { primary, retry_generator, retry_timeout }
  }

  pub fn primary(&self) -> &LessonOrchestrator {
    &self.primary
  }

  /// Run the primary pipeline, degrading on generation failure only
  pub async fn process(
    &self,
    profile: &LearnerProfile,
    request: &LessonRequest,
  ) -> Result<LessonOutcome, LessonError> {
    match self.primary.process(profile, request).await {
      Err(LessonError::Generation(cause @ GenerationError::RateLimited { .. })) => {
        warn!(error = %cause, "primary generation rate limited, not retrying");
        Err(LessonError::Generation(cause))
      }
      Err(LessonError::Generation(cause)) => {
        warn!(error = %cause, "primary generation failed, retrying with simplified request");
        Ok(self.recover(profile, request, cause).await)
      }
      other => other,
    }
  }

  async fn recover(
    &self,
    profile: &LearnerProfile,
    request: &LessonRequest,
    cause: GenerationError,
  ) -> LessonOutcome {
    let mut simplified = request.clone();
    simplified.complexity = Some("basic".to_string());

    let priorities = normalize_priorities(&simplified);
    let allocation = compute_time_allocation(&priorities);
    let fingerprint = derive_key(profile, request, &priorities);
    let mut stages = vec![Stage::Fallback];

    simplified.phase_priorities = Some(priorities.to_raw());
    let prompt = build_lesson_prompt(profile, &simplified, &priorities, &allocation);
    stages.push(Stage::PromptBuilt);

    let retried = generate_within(
      self.retry_generator.as_ref(),
      &prompt,
      &GenerationParams::LIGHTWEIGHT,
      self.retry_timeout,
    )
    .await;

    let lesson = match retried {
      Ok(output) => {
        stages.push(Stage::Generated);
        let validate = self.primary.config().validate_content;
        let (lesson, stage) = assemble_lesson(
          output,
          self.primary.cache().now(),
          self.retry_generator.model_id(),
          &priorities,
          &allocation,
          request,
          validate,
        );
        stages.push(stage);
        info!(%fingerprint, "simplified retry succeeded");
        lesson
      }
      Err(retry_error) => {
        error!(first = %cause, retry = %retry_error, "retry failed, serving fallback lesson");
        fallback_lesson(request, self.primary.cache().now())
      }
    };
    stages.push(Stage::Done);

    LessonOutcome {
      response: LessonResponse::from_lesson(&lesson, false),
      fingerprint,
      priorities,
      time_allocation: allocation,
      stages,
    }
  }
}

/// Hand-built lesson tagged as a fallback
pub fn fallback_lesson(request: &LessonRequest, timestamp: DateTime<Utc>) -> GeneratedLesson {
  let priorities = PriorityProfile::minimal_default();
  GeneratedLesson {
    lesson_content: fallback_lesson_content(request),
    metadata: LessonMetadata {
      timestamp,
      model_used: FALLBACK_MODEL.to_string(),
      priority_focus: priorities.must_have.clone(),
      phase_optimized: request.current_phase,
      time_allocation: compute_time_allocation(&priorities),
      format: LessonFormat::Fallback,
    },
  }
}
