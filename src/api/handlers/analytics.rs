use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;

use super::{ApiResponse, PageQuery};
use crate::analytics::MAX_SNAPSHOT_PAGE;
use crate::api::ws_types::WsMessage;
use crate::errors::AppError;
use crate::models::RiskSnapshot;
use crate::AppState;

const DEFAULT_PAGE: i64 = 20;

/// POST /api/analytics/snapshot/:position_id
pub async fn snapshot(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<Json<ApiResponse<RiskSnapshot>>, AppError> {
    let snapshot = state.recorder.snapshot_position(&position_id).await?;
    let _ = state.ws_tx.send(WsMessage::RiskSnapshot(snapshot.clone()));
    Ok(Json(ApiResponse::ok(snapshot)))
}

/// GET /api/analytics/snapshots
pub async fn snapshots(
    State(state): State<AppState>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<RiskSnapshot>>>, AppError> {
    let Query(page) = page?;
    let (limit, offset) = page.resolve(DEFAULT_PAGE, MAX_SNAPSHOT_PAGE)?;
    let snapshots = state.recorder.list_snapshots(limit, offset).await?;
    Ok(Json(ApiResponse::ok(snapshots)))
}
