use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::analytics::{assess_positions, CriticalPosition, HealthDistribution, SystemStatus};
use crate::errors::AppError;
use crate::models::Position;
use crate::AppState;

const DEFAULT_POSITIONS_LIMIT: i64 = 100;
const MAX_POSITIONS_LIMIT: i64 = 1_000;
const SCAN_PAGE: i64 = 500;

#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub total_positions: i64,
    pub liquidatable_positions: u64,
    pub average_health_factor: f64,
    pub system_uptime_seconds: u64,
    pub status: SystemStatus,
}

#[derive(Debug, Serialize)]
pub struct PositionMetrics {
    pub evaluated_positions: u64,
    pub skipped: u64,
    pub health_distribution: HealthDistribution,
    pub average_health_factor: f64,
    pub critical_positions: Vec<CriticalPosition>,
}

#[derive(Debug, Deserialize)]
pub struct PositionMetricsQuery {
    pub limit: Option<i64>,
}

/// GET /api/metrics/system
pub async fn system(State(state): State<AppState>) -> Result<Json<ApiResponse<SystemMetrics>>, AppError> {
    let total_positions = state.positions.count().await?;
    let positions = load_all(&state).await?;
    let report = assess_positions(&state.pipeline, positions).await;

    let status = SystemStatus::from_counts(report.evaluated, report.liquidatable);
    Ok(Json(ApiResponse::ok(SystemMetrics {
        total_positions,
        liquidatable_positions: report.liquidatable,
        average_health_factor: report.average_health_factor,
        system_uptime_seconds: state.started_at.elapsed().as_secs(),
        status,
    })))
}

/// GET /api/metrics/positions
pub async fn positions(
    State(state): State<AppState>,
    query: Result<Query<PositionMetricsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<PositionMetrics>>, AppError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_POSITIONS_LIMIT);
    if !(1..=MAX_POSITIONS_LIMIT).contains(&limit) {
        return Err(AppError::Unprocessable(format!(
            "limit must be between 1 and {MAX_POSITIONS_LIMIT}"
        )));
    }

    let positions = state.positions.list(limit, 0).await?;
    let report = assess_positions(&state.pipeline, positions).await;

    Ok(Json(ApiResponse::ok(PositionMetrics {
        evaluated_positions: report.evaluated,
        skipped: report.skipped,
        health_distribution: report.distribution,
        average_health_factor: report.average_health_factor,
        critical_positions: report.critical_positions,
    })))
}

async fn load_all(state: &AppState) -> Result<Vec<Position>, AppError> {
    let mut all = Vec::new();
    let mut offset = 0;
    loop {
        let page = state.positions.list(SCAN_PAGE, offset).await?;
        let fetched = page.len() as i64;
        all.extend(page);
        if fetched < SCAN_PAGE {
            return Ok(all);
        }
        offset += fetched;
    }
}
