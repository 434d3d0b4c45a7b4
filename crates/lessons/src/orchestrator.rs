//! The lesson pipeline
//!
//! `normalize -> derive key -> check cache -> (miss) prompt -> generate ->
//! validate -> store -> respond`. Store failures never fail a request;
//! generation failures always do. Retrying is the fallback layer's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::LessonCache;
use crate::content::{
  text_fallback_content, validate_lesson_content, GeneratedLesson, LessonFormat, LessonMetadata,
};
use crate::errors::{classify, LessonError, Recovery};
use crate::fingerprint::{derive_key, Fingerprint};
use crate::generation::{GenerationError, GenerationOutput, GenerationParams, GenerationService};
use crate::model::{LearnerProfile, LessonRequest};
use crate::priorities::{compute_time_allocation, normalize_priorities, PriorityProfile, TimeAllocation};
use crate::prompt::build_lesson_prompt;
use crate::response::LessonResponse;

/// Checkpoints a request passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Received,
  PrioritiesNormalized,
  KeyDerived,
  CacheChecked,
  CacheHit,
  CacheMiss,
  PromptBuilt,
  Generated,
  Validated,
  ValidationSkipped,
  CacheStoreAttempted,
  /// Primary generation failed and the fallback layer took over
  Fallback,
  Done,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
  pub generation_timeout: Duration,
  pub params: GenerationParams,
  /// Run the structural content check on generated lessons
  pub validate_content: bool,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      generation_timeout: Duration::from_secs(60),
      params: GenerationParams::PRIMARY,
      validate_content: true,
    }
  }
}

#[derive(Debug, Clone)]
pub struct LessonOutcome {
  pub response: LessonResponse,
  pub fingerprint: Fingerprint,
  pub priorities: PriorityProfile,
  pub time_allocation: TimeAllocation,
  pub stages: Vec<Stage>,
}

impl LessonOutcome {
  pub fn visited(&self, stage: Stage) -> bool {
    self.stages.contains(&stage)
  }
}

pub struct LessonOrchestrator {
  cache: LessonCache,
  generator: Arc<dyn GenerationService>,
  config: OrchestratorConfig,
}

impl LessonOrchestrator {
  pub fn new(
    cache: LessonCache,
    generator: Arc<dyn GenerationService>,
    config: OrchestratorConfig,
  ) -> Self {
    Self { cache, generator, config }
  }

  pub fn cache(&self) -> &LessonCache {
    &self.cache
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  pub async fn process(
    &self,
    profile: &LearnerProfile,
    request: &LessonRequest,
  ) -> Result<LessonOutcome, LessonError> {
    let mut stages = vec![Stage::Received];

    let priorities = normalize_priorities(request);
    let allocation = compute_time_allocation(&priorities);
    stages.push(Stage::PrioritiesNormalized);
    debug!(must_have = priorities.must_have.len(), "priorities normalized");

    let fingerprint = derive_key(profile, request, &priorities);
    stages.push(Stage::KeyDerived);

    let cached = match self.cache.get(&fingerprint).await {
      Ok(entry) => entry,
      Err(e) => absorb(e.into(), "cache read failed, treating as miss")?,
    };
    stages.push(Stage::CacheChecked);

    if let Some(entry) = cached {
      info!(%fingerprint, "serving lesson from cache");
      let cache_stats = match self.cache.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => absorb(e.into(), "cache stats unavailable, omitting from response")?,
      };
      stages.extend([Stage::CacheHit, Stage::Done]);
      return Ok(LessonOutcome {
        response: LessonResponse::from_lesson(&entry.lesson, true).with_cache_stats(cache_stats),
        fingerprint,
        priorities,
        time_allocation: allocation,
        stages,
      });
    }
    stages.push(Stage::CacheMiss);
    info!(%fingerprint, "cache miss, generating lesson");

    let mut augmented = request.clone();
    augmented.phase_priorities = Some(priorities.to_raw());
    let prompt = build_lesson_prompt(profile, &augmented, &priorities, &allocation);
    stages.push(Stage::PromptBuilt);

    let output = generate_within(
      self.generator.as_ref(),
      &prompt,
      &self.config.params,
      self.config.generation_timeout,
    )
    .await?;
    stages.push(Stage::Generated);

    let (lesson, validation_stage) = assemble_lesson(
      output,
      self.cache.now(),
      self.generator.model_id(),
      &priorities,
      &allocation,
      request,
      self.config.validate_content,
    );
    stages.push(validation_stage);

    if let Err(e) = self.cache.put(&fingerprint, &lesson, profile, request).await {
      absorb::<()>(e.into(), "failed to cache lesson, continuing")?;
    }
    stages.push(Stage::CacheStoreAttempted);
    stages.push(Stage::Done);

    Ok(LessonOutcome {
      response: LessonResponse::from_lesson(&lesson, false),
      fingerprint,
      priorities,
      time_allocation: allocation,
      stages,
    })
  }
}

/// Log a recoverable failure and yield the "nothing there" value
fn absorb<T: Default>(error: LessonError, context: &str) -> Result<T, LessonError> {
  match classify(&error) {
    Recovery::AsAbsence | Recovery::WithDefault => {
      warn!(%error, "{context}");
      Ok(T::default())
    }
    Recovery::Fatal => Err(error),
  }
}

/// Call the generator, giving up after `limit`
pub(crate) async fn generate_within(
  generator: &dyn GenerationService,
  prompt: &str,
  params: &GenerationParams,
  limit: Duration,
) -> Result<GenerationOutput, GenerationError> {
  match tokio::time::timeout(limit, generator.generate(prompt, params)).await {
    Ok(result) => result,
    Err(_) => {
      warn!(seconds = limit.as_secs(), "generation timed out");
      Err(GenerationError::Timeout { seconds: limit.as_secs() })
    }
  }
}

/// Wrap generator output into a lesson, checking structure when asked
pub(crate) fn assemble_lesson(
  output: GenerationOutput,
  timestamp: DateTime<Utc>,
  model_used: String,
  priorities: &PriorityProfile,
  allocation: &TimeAllocation,
  request: &LessonRequest,
  validate: bool,
) -> (GeneratedLesson, Stage) {
  let (lesson_content, format, stage) = match output {
    GenerationOutput::Structured(content) => {
      let stage = if validate {
        validate_lesson_content(&content);
        Stage::Validated
      } else {
        Stage::ValidationSkipped
      };
      (content, LessonFormat::Structured, stage)
    }
    GenerationOutput::RawText(text) => {
      (text_fallback_content(&text), LessonFormat::TextFallback, Stage::ValidationSkipped)
    }
  };

  let lesson = GeneratedLesson {
    lesson_content,
    metadata: LessonMetadata {
      timestamp,
      model_used,
      priority_focus: priorities.must_have.clone(),
      phase_optimized: request.current_phase,
      time_allocation: *allocation,
      format,
    },
  };
  (lesson, stage)
}
