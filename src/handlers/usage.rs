use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

use super::error::ApiError;
use crate::models::UsageResponse;
use crate::state::AppState;

// Public usage lookup by key; read-only
pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Path(api_key): Path<String>,
) -> Result<Json<UsageResponse>, ApiError> {
    let snapshot = state.reporter.report(&api_key, state.clock.now()).await?;
    Ok(Json(UsageResponse::with_window(&snapshot)))
}
