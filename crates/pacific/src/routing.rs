//! Axum router configuration for all endpoints

use axum::{
  middleware::from_fn,
  routing::{get, post},
  Router,
};

use crate::handlers::{admin, lesson, profile, simulation, status};
use crate::middleware::request_context_middleware;
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/health", get(status::health))
    .route("/version", get(status::version))
    .route("/api/schema", get(status::schema))
    // Lesson generation
    .route("/lesson", post(lesson::generate_lesson))
    .route("/api/ai/generate-lesson", post(lesson::generate_lesson))
    // Conversation simulation
    .route("/api/ai/generate-scenario", post(simulation::scenario))
    .route("/api/ai/generate-dialogue", post(simulation::dialogue))
    .route("/api/ai/continue-dialogue", post(simulation::continue_conversation))
    // Profiles
    .route("/profile", get(profile::get_profile).post(profile::save_profile))
    // Administration
    .route("/admin/cache/sweep", post(admin::sweep_cache))
    .layer(from_fn(request_context_middleware))
    .with_state(state)
}
