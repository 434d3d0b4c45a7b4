//! Shared application state handed to every handler

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use lessons::generation::{ConverseClient, ConverseConfig};
use lessons::{
  FallbackLayer, FileLessonStore, LearnerProfile, LessonCache, LessonError, LessonOrchestrator,
  LessonOutcome, LessonRequest, LessonStore, MemoryLessonStore, OrchestratorConfig,
};

use crate::config::{ServerConfig, StoreKind};
use crate::profiles::{FileProfileStore, MemoryProfileStore, ProfileStore};

/// Extra time the HTTP client waits beyond the pipeline timeout, so the
/// pipeline reports the timeout rather than the transport
const CLIENT_TIMEOUT_SLACK_SECS: u64 = 5;

#[derive(Clone)]
pub struct AppState {
  pub orchestrator: Arc<LessonOrchestrator>,
  pub fallback: Option<Arc<FallbackLayer>>,
  pub profiles: Arc<dyn ProfileStore>,
  /// Human-readable storage backend name for the health endpoint
  pub storage: String,
}

impl AppState {
  pub fn new(orchestrator: Arc<LessonOrchestrator>, profiles: Arc<dyn ProfileStore>) -> Self {
    Self { orchestrator, fallback: None, profiles, storage: "memory".to_string() }
  }

  pub fn with_fallback(mut self, fallback: FallbackLayer) -> Self {
    self.fallback = Some(Arc::new(fallback));
    self
  }

  pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
    self.storage = storage.into();
    self
  }

  pub fn cache(&self) -> &LessonCache {
    self.orchestrator.cache()
  }

  /// Run a canonical request through the fallback layer when enabled
  pub async fn generate_lesson(
    &self,
    profile: &LearnerProfile,
    request: &LessonRequest,
  ) -> Result<LessonOutcome, LessonError> {
    match &self.fallback {
      Some(fallback) => fallback.process(profile, request).await,
      None => self.orchestrator.process(profile, request).await,
    }
  }

  /// Wire stores and generation clients as configured
  pub async fn from_config(config: &ServerConfig) -> Result<Self> {
    let (lesson_store, profiles, storage) = match config.store {
      StoreKind::Memory => {
        let lessons: Arc<dyn LessonStore> = Arc::new(MemoryLessonStore::new());
        let profiles: Arc<dyn ProfileStore> = Arc::new(MemoryProfileStore::new());
        (lessons, profiles, "memory".to_string())
      }
      StoreKind::File => {
        let lessons_dir = config.lessons_dir();
        let lessons: Arc<dyn LessonStore> = Arc::new(
          FileLessonStore::open(&lessons_dir)
            .await
            .with_context(|| format!("failed to open lesson store at {}", lessons_dir.display()))?,
        );
        let profiles: Arc<dyn ProfileStore> = Arc::new(
          FileProfileStore::open(config.profiles_dir()).await.context("failed to open profile store")?,
        );
        (lessons, profiles, format!("file:{}", config.data_dir.display()))
      }
    };

    let api_key = config.api_key();
    if api_key.is_none() {
      info!(variable = %config.api_key_env, "no API key set, calling generation endpoint unauthenticated");
    }

    let converse = |model_id: &str| {
      ConverseClient::new(ConverseConfig {
        endpoint: config.endpoint.clone(),
        model_id: model_id.to_string(),
        api_key: api_key.clone(),
        timeout_secs: config.timeout_secs + CLIENT_TIMEOUT_SLACK_SECS,
      })
    };

    let orchestrator = Arc::new(LessonOrchestrator::new(
      LessonCache::new(lesson_store),
      Arc::new(converse(&config.primary_model)?),
      OrchestratorConfig {
        generation_timeout: config.timeout(),
        validate_content: config.validate_content,
        ..OrchestratorConfig::default()
      },
    ));

    let mut state = Self::new(orchestrator.clone(), profiles).with_storage(storage);
    if config.fallback_enabled {
      let retry = Arc::new(converse(&config.fallback_model)?);
      state = state.with_fallback(FallbackLayer::new(orchestrator, retry, config.timeout()));
    }

    info!(
      store = %state.storage,
      primary_model = %config.primary_model,
      fallback_enabled = config.fallback_enabled,
      "application state ready"
    );
    Ok(state)
  }

  pub fn generation_timeout(&self) -> Duration {
    self.orchestrator.config().generation_timeout
  }
}
