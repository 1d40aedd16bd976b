use serde::Serialize;
use thiserror::Error;

use crate::pricing::PriceError;
use crate::store::StoreError;

/// Stable classification of pipeline failures. Front ends branch on this,
/// never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InvalidAmount,
    PositionNotFound,
    PriceUnavailable,
    ExecutionFailed,
    ExecutionInProgress,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::PositionNotFound => "position_not_found",
            ErrorKind::PriceUnavailable => "price_unavailable",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::ExecutionInProgress => "execution_in_progress",
            ErrorKind::Storage => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum LiquidationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid {field} '{value}': {reason}")]
    InvalidAmount {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("position with ID '{0}' not found")]
    PositionNotFound(String),

    #[error("price unavailable for {symbol}: {source}")]
    PriceUnavailable { symbol: String, source: PriceError },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("liquidation already in progress for position '{0}'")]
    ExecutionInProgress(String),

    /// Failure of the inner simulation during `execute`. Keeps the inner kind.
    #[error("simulation failed: {0}")]
    Simulation(Box<LiquidationError>),

    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}

impl LiquidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LiquidationError::InvalidInput(_) => ErrorKind::InvalidInput,
            LiquidationError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            LiquidationError::PositionNotFound(_) => ErrorKind::PositionNotFound,
            LiquidationError::PriceUnavailable { .. } => ErrorKind::PriceUnavailable,
            LiquidationError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            LiquidationError::ExecutionInProgress(_) => ErrorKind::ExecutionInProgress,
            LiquidationError::Simulation(inner) => inner.kind(),
            LiquidationError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// The underlying price failure, if this is a price error.
    pub fn price_error(&self) -> Option<&PriceError> {
        match self {
            LiquidationError::PriceUnavailable { source, .. } => Some(source),
            LiquidationError::Simulation(inner) => inner.price_error(),
            _ => None,
        }
    }
}

impl From<StoreError> for LiquidationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Backend(err) => LiquidationError::Storage(err),
            StoreError::Conflict(msg) => LiquidationError::Storage(anyhow::anyhow!(msg)),
        }
    }
}
