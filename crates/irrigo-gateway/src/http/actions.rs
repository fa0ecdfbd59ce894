use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::AppState;
use crate::controller::ActionRow;

#[derive(Deserialize)]
pub struct ActionQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ActionResponse {
    pub actions: Vec<ActionRow>,
}

/// GET /actions?limit=N: most recent switch actions, oldest first.
pub async fn recent_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
) -> Json<ActionResponse> {
    let limit = query
        .limit
        .unwrap_or(state.config.scheduler.action_log_limit);
    Json(ActionResponse {
        actions: state.controller.recent_actions(limit),
    })
}
