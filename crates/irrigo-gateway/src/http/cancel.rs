//! "Cancel today's watering" toggle.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{api_error, ApiResult};
use crate::app::AppState;
use crate::controller::OverrideView;

/// GET /override
pub async fn get_handler(State(state): State<Arc<AppState>>) -> ApiResult<OverrideView> {
    state.controller.override_view().map(Json).map_err(api_error)
}

/// POST /override/toggle: cancel today, or restore if today is canceled.
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> ApiResult<OverrideView> {
    state.controller.toggle_override().map(Json).map_err(api_error)
}
