use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use super::liquidation::ExecuteRequest;
use super::ApiResponse;
use crate::api::ws_types::WsMessage;
use crate::errors::AppError;
use crate::liquidation::{LiquidationResult, SimulationResult};
use crate::models::{CreatePositionRequest, Position};
use crate::AppState;

pub const MAX_BATCH_POSITIONS: usize = 100;
pub const MAX_BATCH_SIMULATIONS: usize = 50;
pub const MAX_BATCH_EXECUTIONS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct BatchPositionsRequest {
    pub positions: Vec<CreatePositionRequest>,
}

#[derive(Debug, Deserialize)]
pub struct BatchSimulateRequest {
    pub position_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchExecuteRequest {
    pub liquidations: Vec<ExecuteRequest>,
}

/// Failure of one item; `index` points into the request array.
#[derive(Debug, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub position_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchPositionsResponse {
    pub created_count: usize,
    pub error_count: usize,
    pub positions: Vec<Position>,
    pub errors: Vec<BatchItemError>,
}

#[derive(Debug, Serialize)]
pub struct BatchSimulateResponse {
    pub simulated_count: usize,
    pub error_count: usize,
    pub results: Vec<SimulationResult>,
    pub errors: Vec<BatchItemError>,
}

#[derive(Debug, Serialize)]
pub struct BatchExecuteResponse {
    pub executed_count: usize,
    pub error_count: usize,
    pub results: Vec<LiquidationResult>,
    pub errors: Vec<BatchItemError>,
}

fn check_batch_size(len: usize, max: usize, what: &str) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::BadRequest(format!("at least one {what} is required")));
    }
    if len > max {
        return Err(AppError::BadRequest(format!(
            "Maximum {max} {what}s allowed per batch"
        )));
    }
    Ok(())
}

/// Split per-item outcomes into successes and indexed errors.
fn partition<T, E: std::fmt::Display>(
    outcomes: Vec<(String, Result<T, E>)>,
) -> (Vec<T>, Vec<BatchItemError>) {
    let mut ok = Vec::new();
    let mut errors = Vec::new();
    for (index, (position_id, outcome)) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => ok.push(value),
            Err(e) => errors.push(BatchItemError {
                index,
                position_id,
                error: e.to_string(),
            }),
        }
    }
    (ok, errors)
}

/// POST /api/batch/positions
///
/// Items are created one after another so duplicates inside the batch
/// resolve in request order.
pub async fn create_positions(
    State(state): State<AppState>,
    body: Result<Json<BatchPositionsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchPositionsResponse>>, AppError> {
    let Json(req) = body?;
    check_batch_size(req.positions.len(), MAX_BATCH_POSITIONS, "position")?;

    let mut outcomes = Vec::with_capacity(req.positions.len());
    for item in &req.positions {
        let outcome = match item.validate() {
            Ok(new_position) => state.positions.create(new_position).await.map_err(AppError::from),
            Err(e) => Err(AppError::from(e)),
        };
        outcomes.push((item.position_id.clone(), outcome));
    }

    let (positions, errors) = partition(outcomes.into_iter().map(|(id, r)| (id, r.map_err(message))).collect());
    tracing::info!(created = positions.len(), failed = errors.len(), "Batch position create");

    Ok(Json(ApiResponse::ok(BatchPositionsResponse {
        created_count: positions.len(),
        error_count: errors.len(),
        positions,
        errors,
    })))
}

/// POST /api/batch/simulate
pub async fn simulate(
    State(state): State<AppState>,
    body: Result<Json<BatchSimulateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchSimulateResponse>>, AppError> {
    let Json(req) = body?;
    check_batch_size(req.position_ids.len(), MAX_BATCH_SIMULATIONS, "position")?;

    let outcomes = join_all(req.position_ids.iter().map(|id| {
        let pipeline = state.pipeline.clone();
        async move { (id.clone(), pipeline.simulate(id).await) }
    }))
    .await;

    let (results, errors) = partition(outcomes);
    Ok(Json(ApiResponse::ok(BatchSimulateResponse {
        simulated_count: results.len(),
        error_count: errors.len(),
        results,
        errors,
    })))
}

/// POST /api/batch/execute
pub async fn execute(
    State(state): State<AppState>,
    body: Result<Json<BatchExecuteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchExecuteResponse>>, AppError> {
    let Json(req) = body?;
    check_batch_size(req.liquidations.len(), MAX_BATCH_EXECUTIONS, "liquidation")?;

    let outcomes = join_all(req.liquidations.iter().map(|item| {
        let pipeline = state.pipeline.clone();
        async move {
            let outcome = pipeline.execute(&item.position_id, item.max_slippage_bps).await;
            (item.position_id.clone(), outcome)
        }
    }))
    .await;

    let (results, errors) = partition(outcomes);
    for result in results.iter().filter(|r| r.executed()) {
        let _ = state.ws_tx.send(WsMessage::Liquidation(result.clone()));
    }

    Ok(Json(ApiResponse::ok(BatchExecuteResponse {
        executed_count: results.len(),
        error_count: errors.len(),
        results,
        errors,
    })))
}

/// Client-facing text of an item error; internal causes stay in the log.
fn message(e: AppError) -> String {
    match e {
        AppError::Internal(err) => {
            tracing::error!("Batch item failed: {err:?}");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    }
}
