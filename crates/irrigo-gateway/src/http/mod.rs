pub mod actions;
pub mod cancel;
pub mod device;
pub mod health;
pub mod schedule;
pub mod valves;

use axum::{http::StatusCode, Json};
use irrigo_core::IrrigoError;
use irrigo_device::CommandOutcome;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Map a domain error onto an HTTP status plus `{ error, code }` body.
pub fn api_error(e: IrrigoError) -> ApiError {
    let status = match &e {
        IrrigoError::InvalidEntry(_) => StatusCode::BAD_REQUEST,
        IrrigoError::UnknownValve { .. } | IrrigoError::EntryNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    (
        status,
        Json(ErrorBody {
            code: e.code(),
            error: e.to_string(),
        }),
    )
}

/// Device outcomes are always returned as a body; the status tells the
/// operator whether the relay board actually took the command.
pub fn outcome_response(outcome: CommandOutcome) -> (StatusCode, Json<CommandOutcome>) {
    let status = match &outcome {
        CommandOutcome::Acknowledged { .. } => StatusCode::OK,
        CommandOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CommandOutcome::Unreachable { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome))
}
