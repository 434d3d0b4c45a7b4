//! REST server startup and background maintenance

use anyhow::{anyhow, Result};
use axum::serve;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use lessons::LessonOrchestrator;

use crate::config::ServerConfig;
use crate::routing::create_router;
use crate::state::AppState;

/// Start the REST server and run until interrupted
pub async fn start_server(config: ServerConfig) -> Result<()> {
  info!("Starting PACIFIC REST server v{}", env!("CARGO_PKG_VERSION"));
  let state = AppState::from_config(&config).await?;

  let sweeper = config.sweep_interval().map(|every| spawn_sweeper(state.orchestrator.clone(), every));

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(config.bind).await?;
  info!("Server listening on {}", config.bind);

  let result = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;

  if let Some(handle) = sweeper {
    handle.abort();
  }

  match result {
    Ok(()) => {
      info!("Server shutdown gracefully");
      Ok(())
    }
    Err(e) => {
      error!(error = %e, "server error");
      Err(anyhow!("Server error: {e}"))
    }
  }
}

/// Periodically remove lessons past the freshness window
pub fn spawn_sweeper(orchestrator: Arc<LessonOrchestrator>, every: Duration) -> JoinHandle<()> {
  info!(interval_secs = every.as_secs(), "starting cache sweeper");
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      match orchestrator.cache().sweep_expired().await {
        Ok(0) => debug!("sweep found nothing to remove"),
        Ok(removed) => info!(removed, "swept stale lessons"),
        Err(e) => error!(error = %e, "cache sweep failed"),
      }
    }
  })
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(error = %e, "failed to listen for shutdown signal");
    // Without a signal handler keep serving until the process is killed
    std::future::pending::<()>().await;
  }
  info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use chrono::Duration as ChronoDuration;
  use lessons::fallback::fallback_lesson;
  use lessons::{
    Fingerprint, GenerationError, GenerationOutput, GenerationParams, GenerationService,
    LearnerProfile, LessonCache, LessonRequest, ManualClock, MemoryLessonStore, OrchestratorConfig,
  };
  use serde_json::json;

  struct Unused;

  #[async_trait]
  impl GenerationService for Unused {
    fn model_id(&self) -> String {
      "unused".to_string()
    }

    async fn generate(&self, _: &str, _: &GenerationParams) -> Result<GenerationOutput, GenerationError> {
      Err(GenerationError::failed("not expected"))
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_sweeper_removes_stale_lessons() {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryLessonStore::with_clock(clock.clone()));
    let cache = LessonCache::with_clock(store, clock.clone());

    let profile: LearnerProfile = serde_json::from_value(json!({
      "nationality": "US",
      "nativeLanguages": ["English"],
      "learningStyle": "balanced"
    }))
    .unwrap();
    let request = LessonRequest::new("Spanish", "Travel");
    let fingerprint = Fingerprint::parse("00000000000000aa").unwrap();
    cache.put(&fingerprint, &fallback_lesson(&request, cache.now()), &profile, &request).await.unwrap();
    clock.advance(ChronoDuration::hours(25));

    let orchestrator =
      Arc::new(LessonOrchestrator::new(cache, Arc::new(Unused), OrchestratorConfig::default()));
    let handle = spawn_sweeper(orchestrator.clone(), Duration::from_secs(60));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(orchestrator.cache().stats().await.unwrap().entry_count, 0);
    handle.abort();
  }
}
