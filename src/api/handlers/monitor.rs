use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::ApiResponse;
use crate::errors::AppError;
use crate::services::MonitorStatus;
use crate::AppState;

/// POST /api/monitor/start
pub async fn start(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>, AppError> {
    state.monitor.start()?;
    Ok(Json(ApiResponse::ok(json!({ "status": "started" }))))
}

/// POST /api/monitor/stop
pub async fn stop(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    state.monitor.stop().await;
    Json(ApiResponse::ok(json!({ "status": "stopped" })))
}

/// GET /api/monitor/status
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<MonitorStatus>> {
    Json(ApiResponse::ok(state.monitor.status()))
}
