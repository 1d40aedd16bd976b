use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::ApiResponse;
use crate::api::ws_types::WsMessage;
use crate::errors::AppError;
use crate::liquidation::{LiquidationResult, SimulationResult};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub position_id: String,
    pub max_slippage_bps: i64,
}

/// GET /api/liquidation/simulate/:position_id
pub async fn simulate(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<Json<ApiResponse<SimulationResult>>, AppError> {
    let result = state.pipeline.simulate(&position_id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// POST /api/liquidation/execute
pub async fn execute(
    State(state): State<AppState>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LiquidationResult>>, AppError> {
    let Json(req) = body?;
    let result = state.pipeline.execute(&req.position_id, req.max_slippage_bps).await?;

    if result.executed() {
        // No subscribers is fine.
        let _ = state.ws_tx.send(WsMessage::Liquidation(result.clone()));
    }
    Ok(Json(ApiResponse::ok(result)))
}
