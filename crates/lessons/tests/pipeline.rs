//! End-to-end pipeline behaviour against in-memory stores and mocked models

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use lessons::store::EntryPredicate;
use lessons::{
  derive_key, CacheEntry, Clock, ErrorCode, ErrorResponse, FallbackLayer, Fingerprint, GenerationError,
  GenerationOutput, GenerationParams, GenerationService, LessonCache, LessonEnvelope, LessonError,
  LessonOrchestrator, LessonStore, ManualClock, MemoryLessonStore, OrchestratorConfig, Stage,
  StoreError, StoreStats,
};

mock! {
  pub Generator {}

  #[async_trait]
  impl GenerationService for Generator {
    fn model_id(&self) -> String;
    async fn generate(
      &self,
      prompt: &str,
      params: &GenerationParams,
    ) -> Result<GenerationOutput, GenerationError>;
  }
}

fn complete_lesson() -> Value {
  json!({
    "lesson": {
      "title": "Viaje a Sevilla",
      "objective": "Ask for directions",
      "themeContext": "A weekend in Seville",
      "coreContent": {
        "vocabulary": [{"word": "estación", "translation": "station", "context": "¿Dónde está la estación?"}],
        "grammar": {"rule": "estar for location", "explanation": "Location uses estar", "examples": ["Está aquí."]},
        "practiceExercises": [
          {"type": "translation", "source": "Where is the hotel?", "target": "¿Dónde está el hotel?"},
          {"type": "fill_blank", "sentence": "El museo ____ cerca", "answer": "está"}
        ]
      }
    }
  })
}

fn envelope(value: Value) -> LessonEnvelope {
  serde_json::from_value(value).unwrap()
}

fn travel_envelope() -> LessonEnvelope {
  envelope(json!({
    "userProfile": {"nativeLanguages": ["English"], "nationality": "US", "learningStyle": "balanced"},
    "lessonRequest": {"targetLanguage": "Spanish", "topic": "Travel"}
  }))
}

fn generator_returning(output: GenerationOutput, times: usize) -> MockGenerator {
  let mut generator = MockGenerator::new();
  generator.expect_model_id().return_const("nova-pro".to_string());
  generator
    .expect_generate()
    .times(times)
    .returning(move |_, _| Ok(output.clone()));
  generator
}

struct Harness {
  clock: Arc<ManualClock>,
  store: Arc<MemoryLessonStore>,
  orchestrator: LessonOrchestrator,
}

fn harness(generator: MockGenerator) -> Harness {
  let clock = Arc::new(ManualClock::starting_now());
  let store = Arc::new(MemoryLessonStore::with_clock(clock.clone()));
  let cache = LessonCache::with_clock(store.clone(), clock.clone());
  let orchestrator =
    LessonOrchestrator::new(cache, Arc::new(generator), OrchestratorConfig::default());
  Harness { clock, store, orchestrator }
}

#[tokio::test]
async fn test_miss_then_hit_for_identical_request() {
  let h = harness(generator_returning(GenerationOutput::Structured(complete_lesson()), 1));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let generated_at = h.clock.now();
  let first = h.orchestrator.process(&profile, &request).await.unwrap();
  assert!(first.visited(Stage::CacheMiss));
  assert!(first.visited(Stage::Validated));
  assert!(!first.response.data.metadata.cached);
  assert_eq!(first.response.data.metadata.timestamp, generated_at);
  assert_eq!(first.response.data.metadata.cache_stats, None);
  assert_eq!(first.time_allocation.total(), 100);
  assert!(!first.priorities.is_empty());
  assert_eq!(first.response.data.metadata.generated_with, "nova-pro");

  h.clock.advance(ChronoDuration::hours(2));
  let second = h.orchestrator.process(&profile, &request).await.unwrap();
  assert_eq!(
    second.stages,
    vec![
      Stage::Received,
      Stage::PrioritiesNormalized,
      Stage::KeyDerived,
      Stage::CacheChecked,
      Stage::CacheHit,
      Stage::Done
    ]
  );
  assert!(second.response.data.metadata.cached);
  assert_eq!(second.response.data.metadata.timestamp, generated_at);
  assert_eq!(second.response.data.metadata.cache_stats.map(|s| s.entry_count), Some(1));
  assert_eq!(second.response.data.lesson_content, first.response.data.lesson_content);
  assert_eq!(second.fingerprint, first.fingerprint);
}

#[tokio::test]
async fn test_stale_entry_is_regenerated() {
  let h = harness(generator_returning(GenerationOutput::Structured(complete_lesson()), 2));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  h.orchestrator.process(&profile, &request).await.unwrap();
  h.clock.advance(ChronoDuration::hours(25));
  let again = h.orchestrator.process(&profile, &request).await.unwrap();
  assert!(again.visited(Stage::CacheMiss));
  assert!(!again.response.data.metadata.cached);
}

#[tokio::test]
async fn test_structured_target_language_matches_flattened_request() {
  let structured = envelope(json!({
    "userProfile": {"nativeLanguages": ["English"], "nationality": "US", "learningStyle": "visual"},
    "lessonRequest": {"targetLanguage": {"language": "Italian", "reason": "loves opera"}, "topic": "Music"}
  }));
  let flattened = envelope(json!({
    "userProfile": {"nativeLanguages": ["English"], "nationality": "US", "learningStyle": "visual"},
    "lessonRequest": {
      "targetLanguage": "Italian",
      "contextualUse": {"inspiration": "loves opera"},
      "topic": "Music"
    }
  }));

  let (profile_a, request_a) = structured.canonicalize().unwrap();
  let (profile_b, request_b) = flattened.canonicalize().unwrap();
  assert_eq!(request_a.target_language, "Italian");
  assert_eq!(request_a.contextual_use.inspiration.as_deref(), Some("loves opera"));

  let h = harness(generator_returning(GenerationOutput::Structured(complete_lesson()), 1));
  let first = h.orchestrator.process(&profile_a, &request_a).await.unwrap();
  let second = h.orchestrator.process(&profile_b, &request_b).await.unwrap();
  assert_eq!(first.fingerprint, second.fingerprint);
  assert!(second.response.data.metadata.cached);
}

#[tokio::test]
async fn test_rate_limit_is_fatal_and_not_cached() {
  let mut generator = MockGenerator::new();
  generator.expect_model_id().return_const("nova-pro".to_string());
  generator
    .expect_generate()
    .times(1)
    .returning(|_, _| Err(GenerationError::rate_limited("Too many requests")));
  let h = harness(generator);
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let err = h.orchestrator.process(&profile, &request).await.unwrap_err();
  assert!(matches!(err, LessonError::Generation(GenerationError::RateLimited { .. })));
  assert_eq!(ErrorResponse::from(&err).error_code, ErrorCode::RateLimited);
  assert_eq!(h.store.stats().await.unwrap().entry_count, 0);
}

#[tokio::test]
async fn test_invalid_content_is_still_cached_and_returned() {
  let mut lesson = complete_lesson();
  let core = lesson["lesson"]["coreContent"].as_object_mut().unwrap();
  core.remove("grammar");
  core.insert("practiceExercises".to_string(), json!([{"type": "basic"}]));
  assert!(!lessons::content::validate_lesson_content(&lesson));

  let h = harness(generator_returning(GenerationOutput::Structured(lesson.clone()), 1));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let outcome = h.orchestrator.process(&profile, &request).await.unwrap();
  assert!(outcome.response.success);
  assert_eq!(outcome.response.data.lesson_content, lesson);
  assert!(outcome.visited(Stage::CacheStoreAttempted));

  let cached = h.store.get(&outcome.fingerprint).await.unwrap().unwrap();
  assert_eq!(cached.lesson.lesson_content, lesson);
}

#[tokio::test]
async fn test_raw_text_skips_validation() {
  let h = harness(generator_returning(GenerationOutput::RawText("hola = hello".to_string()), 1));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let outcome = h.orchestrator.process(&profile, &request).await.unwrap();
  assert!(outcome.visited(Stage::ValidationSkipped));
  assert_eq!(outcome.response.data.lesson_content["lesson"]["content"], "hola = hello");
  assert_eq!(outcome.response.data.lesson_content["lesson"]["format"], "text_fallback");
}

#[tokio::test]
async fn test_prompt_carries_normalized_priorities() {
  let mut generator = MockGenerator::new();
  generator.expect_model_id().return_const("nova-pro".to_string());
  generator
    .expect_generate()
    .withf(|prompt, params| {
      prompt.contains("CRITICAL FOCUS: Ordering food") && *params == GenerationParams::PRIMARY
    })
    .times(1)
    .returning(|_, _| Ok(GenerationOutput::Structured(complete_lesson())));
  let h = harness(generator);

  let (profile, request) = envelope(json!({
    "userProfile": {"nativeLanguages": "English", "nationality": "US", "learningStyle": "balanced"},
    "lessonRequest": {
      "targetLanguage": "Spanish",
      "phasePriorities": {"mustHave": ["  Ordering food ", 7]},
    }
  }))
  .canonicalize()
  .unwrap();

  let outcome = h.orchestrator.process(&profile, &request).await.unwrap();
  assert_eq!(outcome.priorities.must_have, vec!["Ordering food"]);
  assert_eq!(outcome.response.data.metadata.priority_focus, vec!["Ordering food"]);
}

// Store that fails every call
struct BrokenStore;

#[async_trait]
impl LessonStore for BrokenStore {
  async fn get(&self, _: &Fingerprint) -> Result<Option<CacheEntry>, StoreError> {
    Err(StoreError::unavailable("connection refused"))
  }

  async fn put(&self, _: CacheEntry) -> Result<(), StoreError> {
    Err(StoreError::unavailable("connection refused"))
  }

  async fn delete_where(&self, _: &EntryPredicate<'_>) -> Result<usize, StoreError> {
    Err(StoreError::unavailable("connection refused"))
  }

  async fn stats(&self) -> Result<StoreStats, StoreError> {
    Err(StoreError::unavailable("connection refused"))
  }
}

#[tokio::test]
async fn test_store_failures_fail_open() {
  let orchestrator = LessonOrchestrator::new(
    LessonCache::new(Arc::new(BrokenStore)),
    Arc::new(generator_returning(GenerationOutput::Structured(complete_lesson()), 1)),
    OrchestratorConfig::default(),
  );
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let outcome = orchestrator.process(&profile, &request).await.unwrap();
  assert!(outcome.visited(Stage::CacheMiss));
  assert!(outcome.visited(Stage::CacheStoreAttempted));
  assert!(outcome.response.success);
}

// Memory store that cannot report its size
struct NoStatsStore(MemoryLessonStore);

#[async_trait]
impl LessonStore for NoStatsStore {
  async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, StoreError> {
    self.0.get(fingerprint).await
  }

  async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
    self.0.put(entry).await
  }

  async fn delete_where(&self, predicate: &EntryPredicate<'_>) -> Result<usize, StoreError> {
    self.0.delete_where(predicate).await
  }

  async fn stats(&self) -> Result<StoreStats, StoreError> {
    Err(StoreError::unavailable("stats backend offline"))
  }
}

#[tokio::test]
async fn test_cache_hit_without_stats_still_served() {
  let orchestrator = LessonOrchestrator::new(
    LessonCache::new(Arc::new(NoStatsStore(MemoryLessonStore::new()))),
    Arc::new(generator_returning(GenerationOutput::Structured(complete_lesson()), 1)),
    OrchestratorConfig::default(),
  );
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  orchestrator.process(&profile, &request).await.unwrap();
  let hit = orchestrator.process(&profile, &request).await.unwrap();
  assert!(hit.visited(Stage::CacheHit));
  assert!(hit.response.data.metadata.cached);
  assert_eq!(hit.response.data.metadata.cache_stats, None);
}

// Generator that never answers in time
struct StalledGenerator;

#[async_trait]
impl GenerationService for StalledGenerator {
  fn model_id(&self) -> String {
    "stalled".to_string()
  }

  async fn generate(&self, _: &str, _: &GenerationParams) -> Result<GenerationOutput, GenerationError> {
    tokio::time::sleep(Duration::from_secs(3600)).await;
    Ok(GenerationOutput::RawText(String::new()))
  }
}

#[tokio::test(start_paused = true)]
async fn test_generation_timeout() {
  let orchestrator = LessonOrchestrator::new(
    LessonCache::new(Arc::new(MemoryLessonStore::new())),
    Arc::new(StalledGenerator),
    OrchestratorConfig { generation_timeout: Duration::from_secs(5), ..OrchestratorConfig::default() },
  );
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let err = orchestrator.process(&profile, &request).await.unwrap_err();
  assert!(matches!(err, LessonError::Generation(GenerationError::Timeout { seconds: 5 })));
  assert_eq!(ErrorResponse::from(&err).error_code, ErrorCode::GenerationTimeout);
}

#[tokio::test]
async fn test_fallback_retries_with_simplified_request() {
  let mut primary = MockGenerator::new();
  primary.expect_model_id().return_const("nova-pro".to_string());
  primary.expect_generate().times(1).returning(|_, _| Err(GenerationError::failed("boom")));

  let mut lite = MockGenerator::new();
  lite.expect_model_id().return_const("nova-lite".to_string());
  lite
    .expect_generate()
    .withf(|prompt, params| prompt.contains("short and simple") && *params == GenerationParams::LIGHTWEIGHT)
    .times(1)
    .returning(|_, _| Ok(GenerationOutput::Structured(complete_lesson())));

  let h = harness(primary);
  let layer = FallbackLayer::new(Arc::new(h.orchestrator), Arc::new(lite), Duration::from_secs(5));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let outcome = layer.process(&profile, &request).await.unwrap();
  assert!(outcome.visited(Stage::Fallback));
  assert_eq!(outcome.response.data.metadata.generated_with, "nova-lite");
  assert!(!outcome.response.data.metadata.fallback);
  assert_eq!(h.store.stats().await.unwrap().entry_count, 0);
}

#[tokio::test]
async fn test_fallback_lesson_when_retry_also_fails() {
  let mut primary = MockGenerator::new();
  primary.expect_model_id().return_const("nova-pro".to_string());
  primary.expect_generate().times(1).returning(|_, _| Err(GenerationError::Timeout { seconds: 5 }));

  let mut lite = MockGenerator::new();
  lite.expect_model_id().return_const("nova-lite".to_string());
  lite.expect_generate().times(1).returning(|_, _| Err(GenerationError::failed("still down")));

  let h = harness(primary);
  let layer = FallbackLayer::new(Arc::new(h.orchestrator), Arc::new(lite), Duration::from_secs(5));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let now = h.clock.now();
  let outcome = layer.process(&profile, &request).await.unwrap();
  let metadata = &outcome.response.data.metadata;
  assert!(metadata.fallback);
  assert_eq!(metadata.timestamp, now);
  assert_eq!(metadata.generated_with, lessons::fallback::FALLBACK_MODEL);
  assert_eq!(outcome.response.data.lesson_content["lesson"]["title"], "Basic Spanish Lesson: Travel");
  assert_eq!(h.store.stats().await.unwrap().entry_count, 0);
}

#[tokio::test]
async fn test_fallback_layer_does_not_retry_rate_limits() {
  let mut primary = MockGenerator::new();
  primary.expect_model_id().return_const("nova-pro".to_string());
  primary.expect_generate().times(1).returning(|_, _| Err(GenerationError::rate_limited("slow down")));

  let mut lite = MockGenerator::new();
  lite.expect_model_id().return_const("nova-lite".to_string());
  lite.expect_generate().times(0);

  let h = harness(primary);
  let layer = FallbackLayer::new(Arc::new(h.orchestrator), Arc::new(lite), Duration::from_secs(5));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let err = layer.process(&profile, &request).await.unwrap_err();
  assert!(matches!(err, LessonError::Generation(GenerationError::RateLimited { .. })));
  assert_eq!(ErrorResponse::from(&err).error_code, ErrorCode::RateLimited);
  assert_eq!(h.store.stats().await.unwrap().entry_count, 0);
}

#[tokio::test]
async fn test_fallback_layer_passes_through_success() {
  let h = harness(generator_returning(GenerationOutput::Structured(complete_lesson()), 1));
  let lite = MockGenerator::new();
  let layer = FallbackLayer::new(Arc::new(h.orchestrator), Arc::new(lite), Duration::from_secs(5));
  let (profile, request) = travel_envelope().canonicalize().unwrap();

  let outcome = layer.process(&profile, &request).await.unwrap();
  assert!(!outcome.visited(Stage::Fallback));
  assert_eq!(
    outcome.fingerprint,
    derive_key(&profile, &request, &lessons::priorities::normalize_priorities(&request))
  );
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
  let h = harness(generator_returning(GenerationOutput::Structured(complete_lesson()), 2));
  let (profile, request) = travel_envelope().canonicalize().unwrap();
  h.orchestrator.process(&profile, &request).await.unwrap();

  let mut other = request.clone();
  other.topic = "Food".to_string();
  h.clock.advance(ChronoDuration::hours(23));
  h.orchestrator.process(&profile, &other).await.unwrap();

  h.clock.advance(ChronoDuration::hours(2));
  let cache = h.orchestrator.cache();
  assert_eq!(cache.sweep_expired().await.unwrap(), 1);
  assert_eq!(cache.sweep_expired().await.unwrap(), 0);
  assert_eq!(cache.stats().await.unwrap().entry_count, 1);
}
