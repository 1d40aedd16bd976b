use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::{ApiResponse, PageQuery};
use crate::errors::AppError;
use crate::models::{CreatePositionRequest, Position};
use crate::AppState;

const DEFAULT_PAGE: i64 = 10;
const MAX_PAGE: i64 = 100;

/// POST /api/positions
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreatePositionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Position>>), AppError> {
    let Json(req) = body?;
    let new_position = req.validate()?;
    let position = state.positions.create(new_position).await?;

    tracing::info!(
        position_id = %position.position_id,
        owner = %position.owner_address,
        collateral = %position.collateral_symbol,
        debt = %position.debt_symbol,
        "Position created"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(position))))
}

/// GET /api/positions
pub async fn list(
    State(state): State<AppState>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Position>>>, AppError> {
    let Query(page) = page?;
    let (limit, offset) = page.resolve(DEFAULT_PAGE, MAX_PAGE)?;
    let positions = state.positions.list(limit, offset).await?;
    Ok(Json(ApiResponse::ok(positions)))
}

/// GET /api/positions/:position_id
pub async fn detail(
    State(state): State<AppState>,
    Path(position_id): Path<String>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    let position_id = position_id.trim();
    if position_id.is_empty() {
        return Err(AppError::BadRequest("position_id cannot be empty".into()));
    }

    match state.positions.find_by_position_id(position_id).await? {
        Some(position) => Ok(Json(ApiResponse::ok(position))),
        None => Err(AppError::NotFound(format!(
            "position with ID '{position_id}' not found"
        ))),
    }
}
