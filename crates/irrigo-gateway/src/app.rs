use axum::{
    routing::{delete, get, post},
    Router,
};
use irrigo_core::IrrigoConfig;
use std::sync::Arc;

use crate::controller::Controller;
use crate::http;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: IrrigoConfig,
    pub controller: Controller,
}

impl AppState {
    pub fn new(config: IrrigoConfig, controller: Controller) -> Self {
        Self { config, controller }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::health::health_handler))
        .route(
            "/schedule",
            get(http::schedule::list_handler).post(http::schedule::add_handler),
        )
        .route("/schedule/{index}", delete(http::schedule::delete_handler))
        .route("/override", get(http::cancel::get_handler))
        .route("/override/toggle", post(http::cancel::toggle_handler))
        .route(
            "/valves",
            get(http::valves::list_handler).put(http::valves::replace_handler),
        )
        .route("/valves/close-all", post(http::valves::close_all_handler))
        .route("/valves/{id}/on", post(http::valves::on_handler))
        .route("/valves/{id}/off", post(http::valves::off_handler))
        .route("/status", get(http::device::status_handler))
        .route("/uptime", get(http::device::uptime_handler))
        .route("/actions", get(http::actions::recent_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
