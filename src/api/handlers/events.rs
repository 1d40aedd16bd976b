use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiResponse, PageQuery};
use crate::errors::AppError;
use crate::models::ChainEvent;
use crate::AppState;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct IndexRangeQuery {
    pub from_block: i64,
    pub to_block: i64,
}

/// GET /api/events
pub async fn list(
    State(state): State<AppState>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ChainEvent>>>, AppError> {
    let Query(page) = page?;
    let (limit, offset) = page.resolve(DEFAULT_PAGE, MAX_PAGE)?;
    let events = state.indexer.list_events(limit, offset).await?;
    Ok(Json(ApiResponse::ok(events)))
}

/// POST /api/events/index?from_block=&to_block=
pub async fn index_range(
    State(state): State<AppState>,
    range: Result<Query<IndexRangeQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let Query(range) = range?;
    let indexed = state
        .indexer
        .index_block_range(range.from_block, range.to_block)
        .await?;

    tracing::info!(from_block = range.from_block, to_block = range.to_block, indexed, "Indexed block range via API");
    Ok(Json(ApiResponse::ok(json!({ "indexed": indexed }))))
}
