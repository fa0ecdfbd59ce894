//! Live queries against the relay controller. Neither endpoint fails when
//! the controller is offline; the body just comes back empty.

use axum::{extract::State, Json};
use irrigo_device::StatusReading;
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct UptimeResponse {
    pub uptime: Option<String>,
}

/// GET /status: `reachable` is whether the controller answered at all.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusReading> {
    Json(state.controller.query_status().await)
}

/// GET /uptime
pub async fn uptime_handler(State(state): State<Arc<AppState>>) -> Json<UptimeResponse> {
    Json(UptimeResponse {
        uptime: state.controller.uptime().await,
    })
}
