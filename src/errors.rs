use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::liquidation::{ErrorKind, LiquidationError};
use crate::models::PositionValidationError;
use crate::services::{IndexerError, MonitorError};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    TooManyRequests,

    #[error(transparent)]
    Liquidation(#[from] LiquidationError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    kind: &'static str,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Liquidation(e) => liquidation_status(e),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unprocessable(_) => "unprocessable",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized => "unauthorized",
            AppError::TooManyRequests => "rate_limited",
            AppError::Liquidation(e) => e.kind().as_str(),
            AppError::Internal(_) => "internal",
        }
    }
}

/// Status for a pipeline failure. Branches on kind only.
fn liquidation_status(e: &LiquidationError) -> StatusCode {
    match e.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::PositionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::PriceUnavailable => {
            if e.price_error().is_some_and(|p| p.is_unknown_symbol()) {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        ErrorKind::ExecutionInProgress => StatusCode::CONFLICT,
        ErrorKind::ExecutionFailed | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Internal server error".to_string()
            }
            AppError::Liquidation(e) if e.kind() == ErrorKind::Storage => {
                tracing::error!(error = ?e, "Storage failure in liquidation pipeline");
                "Internal server error".to_string()
            }
            AppError::Liquidation(e) => {
                if status.is_server_error() {
                    tracing::error!(kind = e.kind().as_str(), error = %e, "Liquidation request failed");
                }
                e.to_string()
            }
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unprocessable(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".into(),
            AppError::TooManyRequests => "Rate limit exceeded. Please try again later.".into(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
                kind: self.kind(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Backend(err) => AppError::Internal(err),
        }
    }
}

impl From<PositionValidationError> for AppError {
    fn from(e: PositionValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<IndexerError> for AppError {
    fn from(e: IndexerError) -> Self {
        match e {
            IndexerError::Store(err) => err.into(),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<MonitorError> for AppError {
    fn from(e: MonitorError) -> Self {
        AppError::Conflict(e.to_string())
    }
}

/// Syntax errors are 400; well-formed bodies with the wrong shape are 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            AppError::Unprocessable(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Unprocessable(rejection.body_text())
    }
}
