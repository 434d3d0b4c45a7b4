//! Cache administration endpoint handler

use axum::extract::{Extension, State};
use axum::Json;

use crate::middleware::RequestContext;
use crate::state::AppState;
use crate::types::{ApiFailure, SweepResponse};

/// POST /admin/cache/sweep - drop stale lessons now
pub async fn sweep_cache(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> Result<Json<SweepResponse>, ApiFailure> {
  match state.cache().sweep_expired().await {
    Ok(removed) => {
      context.log_info(&format!("sweep removed {removed} stale lessons"));
      Ok(Json(SweepResponse { success: true, removed }))
    }
    Err(e) => {
      context.log_error(&format!("sweep failed: {e}"));
      Err(ApiFailure::internal(format!("Cache sweep failed: {e}")))
    }
  }
}
