//! Weekly schedule endpoints.
//!
//! `GET /schedule` lists entries sorted by weekday then start time. Each row
//! carries its storage `index`, which is what `DELETE /schedule/{index}`
//! expects.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use irrigo_core::ScheduleEntry;
use serde::Serialize;
use std::sync::Arc;

use super::{api_error, ApiError, ApiResult};
use crate::app::AppState;
use crate::controller::ScheduleRow;

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub entries: Vec<ScheduleRow>,
    pub triggers: usize,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub index: usize,
}

/// GET /schedule
pub async fn list_handler(State(state): State<Arc<AppState>>) -> ApiResult<ScheduleResponse> {
    let entries = state.controller.list_schedule().map_err(api_error)?;
    Ok(Json(ScheduleResponse {
        entries,
        triggers: state.controller.trigger_count(),
    }))
}

/// POST /schedule
pub async fn add_handler(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<ScheduleEntry>,
) -> Result<(StatusCode, Json<IndexResponse>), ApiError> {
    let index = state.controller.add_entry(entry).map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(IndexResponse { index })))
}

/// DELETE /schedule/{index}
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult<IndexResponse> {
    state.controller.remove_entry(index).map_err(api_error)?;
    Ok(Json(IndexResponse { index }))
}
