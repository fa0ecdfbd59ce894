use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use irrigo_core::{Command, ValveId, ValveInfo};
use irrigo_device::CommandOutcome;
use std::sync::Arc;

use super::{api_error, outcome_response, ApiError, ApiResult};
use crate::app::AppState;
use crate::controller::ValveRow;

/// GET /valves: effective mapping and display name per known valve.
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ValveRow>> {
    Json(state.controller.valves())
}

/// PUT /valves: replace the whole mapping/name table.
pub async fn replace_handler(
    State(state): State<Arc<AppState>>,
    Json(rows): Json<Vec<ValveInfo>>,
) -> ApiResult<Vec<ValveInfo>> {
    state
        .controller
        .set_valve_config(rows)
        .map(Json)
        .map_err(api_error)
}

async fn switch(
    state: &AppState,
    id: ValveId,
    command: Command,
) -> Result<(StatusCode, Json<CommandOutcome>), ApiError> {
    let outcome = state
        .controller
        .switch_valve(id, command)
        .await
        .map_err(api_error)?;
    Ok(outcome_response(outcome))
}

/// POST /valves/{id}/on
pub async fn on_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ValveId>,
) -> Result<(StatusCode, Json<CommandOutcome>), ApiError> {
    switch(&state, id, Command::On).await
}

/// POST /valves/{id}/off
pub async fn off_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ValveId>,
) -> Result<(StatusCode, Json<CommandOutcome>), ApiError> {
    switch(&state, id, Command::Off).await
}

/// POST /valves/close-all
pub async fn close_all_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CommandOutcome>) {
    outcome_response(state.controller.close_all().await)
}
